use glam::IVec2;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::Graphics::Dwm::{DwmSetWindowAttribute, DWMWINDOWATTRIBUTE};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, GetWindowLongPtrW,
    SetForegroundWindow, SetWindowLongPtrW, SetWindowPos, TrackPopupMenu, GWL_EXSTYLE,
    MF_SEPARATOR, MF_STRING, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
    SWP_NOZORDER, TPM_LEFTALIGN, TPM_NONOTIFY, TPM_RETURNCMD, TPM_TOPALIGN, WS_EX_TOOLWINDOW,
};

use crate::menu::MenuCommand;

/// Extract the Win32 HWND from a winit window.
pub fn get_hwnd(window: &winit::window::Window) -> Option<HWND> {
    let handle = window.window_handle().ok()?;
    match handle.as_raw() {
        RawWindowHandle::Win32(h) => Some(HWND(h.hwnd.get() as *mut core::ffi::c_void)),
        _ => None,
    }
}

unsafe fn set_dwm_u32(hwnd: HWND, attribute: i32, value: u32) {
    let _ = DwmSetWindowAttribute(
        hwnd,
        DWMWINDOWATTRIBUTE(attribute),
        &value as *const u32 as *const core::ffi::c_void,
        4,
    );
}

/// Hide the window from the taskbar and strip every DWM frame decoration,
/// leaving only what wgpu draws.
pub unsafe fn make_tool_window(hwnd: HWND) {
    let style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);

    // Remove WS_EX_LAYERED if present. Add WS_EX_NOREDIRECTIONBITMAP so DWM
    // composes only the DirectComposition visual wgpu creates.
    const WS_EX_LAYERED: isize = 0x00080000;
    const WS_EX_NOREDIRECTIONBITMAP: isize = 0x00200000;

    let new_style =
        (style & !WS_EX_LAYERED) | WS_EX_TOOLWINDOW.0 as isize | WS_EX_NOREDIRECTIONBITMAP;
    SetWindowLongPtrW(hwnd, GWL_EXSTYLE, new_style);
    log::debug!("Window ex-style 0x{:08X} -> 0x{:08X}", style, new_style);

    // Force DWM to recalculate the frame with the new styles.
    let _ = SetWindowPos(
        hwnd,
        HWND::default(),
        0,
        0,
        0,
        0,
        SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
    );

    // DWMWA_NCRENDERING_POLICY = DWMNCRP_DISABLED
    set_dwm_u32(hwnd, 2, 2);
    // DWMWA_WINDOW_CORNER_PREFERENCE = DWMWCP_DONOTROUND
    set_dwm_u32(hwnd, 33, 1);
    // DWMWA_BORDER_COLOR = DWMWA_COLOR_NONE
    set_dwm_u32(hwnd, 34, 0xFFFF_FFFE);
    // DWMWA_SYSTEMBACKDROP_TYPE = DWMSBT_NONE
    set_dwm_u32(hwnd, 38, 1);
}

/// Apply tool-window styling to a winit window.
pub fn setup_pet_window(window: &winit::window::Window) {
    let Some(hwnd) = get_hwnd(window) else {
        log::warn!("No Win32 handle; window keeps its default decorations");
        return;
    };
    unsafe {
        make_tool_window(hwnd);
    }
    log::info!("Win32 tool window setup complete");
}

/// Current global mouse cursor position in screen pixels.
pub fn get_mouse_pos() -> IVec2 {
    let mut point = POINT::default();
    unsafe {
        let _ = GetCursorPos(&mut point);
    }
    IVec2::new(point.x, point.y)
}

/// Show the pet's context menu at the cursor and block until it closes.
/// Returns the chosen command, or None if the menu was dismissed.
pub fn show_context_menu(window: &winit::window::Window) -> Option<MenuCommand> {
    let hwnd = get_hwnd(window)?;
    unsafe {
        let hmenu = match CreatePopupMenu() {
            Ok(hmenu) => hmenu,
            Err(e) => {
                log::warn!("Cannot create popup menu: {e}");
                return None;
            }
        };

        let append = |command: MenuCommand| {
            let wide: Vec<u16> = command
                .label()
                .encode_utf16()
                .chain(std::iter::once(0))
                .collect();
            let _ = AppendMenuW(hmenu, MF_STRING, command.id(), PCWSTR(wide.as_ptr()));
        };
        append(MenuCommand::ShowOverlay);
        let _ = AppendMenuW(hmenu, MF_SEPARATOR, 0, PCWSTR::null());
        append(MenuCommand::Exit);

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required so the menu closes when clicking outside
        let _ = SetForegroundWindow(hwnd);

        // With TPM_RETURNCMD the result is the chosen item id, 0 if none.
        let chosen = TrackPopupMenu(
            hmenu,
            TPM_LEFTALIGN | TPM_TOPALIGN | TPM_RETURNCMD | TPM_NONOTIFY,
            pt.x,
            pt.y,
            0,
            hwnd,
            None,
        );

        let _ = DestroyMenu(hmenu);
        MenuCommand::from_id(chosen.0 as usize)
    }
}
