use winit::keyboard::{Key, NamedKey};
use winit::window::Window;

/// What the user can ask the pet for outside of clicking and dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Exit,
    ShowOverlay,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 2] = [MenuCommand::ShowOverlay, MenuCommand::Exit];

    pub fn label(self) -> &'static str {
        match self {
            MenuCommand::Exit => "Exit",
            MenuCommand::ShowOverlay => "Surprise!",
        }
    }

    /// Native menu item id. Never 0, which means "nothing chosen".
    pub fn id(self) -> usize {
        match self {
            MenuCommand::Exit => 1,
            MenuCommand::ShowOverlay => 2,
        }
    }

    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// Keyboard shortcut: Esc exits, O opens the overlay.
    pub fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::Named(NamedKey::Escape) => Some(MenuCommand::Exit),
            Key::Character(c) if c.eq_ignore_ascii_case("o") => Some(MenuCommand::ShowOverlay),
            _ => None,
        }
    }
}

/// Pop the context menu up at the cursor.
#[cfg(windows)]
pub fn popup(window: &Window) -> Option<MenuCommand> {
    crate::platform::win32::show_context_menu(window)
}

#[cfg(not(windows))]
pub fn popup(_window: &Window) -> Option<MenuCommand> {
    log::debug!("No native context menu on this platform; Esc exits, O shows the overlay");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_zero_is_nothing() {
        for command in MenuCommand::ALL {
            assert_ne!(command.id(), 0);
            assert_eq!(MenuCommand::from_id(command.id()), Some(command));
        }
        assert_eq!(MenuCommand::from_id(0), None);
    }

    #[test]
    fn keyboard_shortcuts() {
        assert_eq!(
            MenuCommand::from_key(&Key::Named(NamedKey::Escape)),
            Some(MenuCommand::Exit)
        );
        assert_eq!(
            MenuCommand::from_key(&Key::Character("O".into())),
            Some(MenuCommand::ShowOverlay)
        );
        assert_eq!(MenuCommand::from_key(&Key::Character("x".into())), None);
    }
}
