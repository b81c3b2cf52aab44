use std::io::Cursor;
use std::path::Path;

use gif::{ColorOutput, DecodeOptions, DisposalMethod};
use image::codecs::gif::GifDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, Rgba, RgbaImage};

use super::{Frame, FrameSequence};
use crate::error::DecodeError;

/// Turns animated GIFs into fixed-size, premultiplied frame sequences.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl FrameDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            filter: FilterType::Lanczos3,
        }
    }

    /// Decode `path`, degrading to an empty sequence on failure.
    /// An empty sequence just means that behavior draws nothing.
    pub fn load(&self, path: &Path) -> FrameSequence {
        match self.decode_file(path) {
            Ok(seq) => {
                log::info!(
                    "Loaded {}: {} frames at {}x{}",
                    path.display(),
                    seq.len(),
                    self.width,
                    self.height
                );
                seq
            }
            Err(e) => {
                log::error!("Cannot load {}: {e}", path.display());
                FrameSequence::empty()
            }
        }
    }

    pub fn decode_file(&self, path: &Path) -> Result<FrameSequence, DecodeError> {
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode(&bytes)
    }

    /// Decode with palette-exact transparency. If any single frame cannot be
    /// processed, the whole sequence is redone with the plain decoder so that
    /// frames never mix the two conversions.
    pub fn decode(&self, bytes: &[u8]) -> Result<FrameSequence, DecodeError> {
        match self.decode_indexed(bytes) {
            Ok(seq) => Ok(seq),
            Err(e) if e.is_frame_error() => {
                log::warn!("{e}; falling back to plain frame copy for the whole sequence");
                self.decode_plain(bytes)
            }
            Err(e) => Err(e),
        }
    }

    fn decode_indexed(&self, bytes: &[u8]) -> Result<FrameSequence, DecodeError> {
        let mut options = DecodeOptions::new();
        options.set_color_output(ColorOutput::Indexed);
        let mut decoder = options.read_info(Cursor::new(bytes))?;

        // Every frame maps indices through the first frame's colors: its local
        // table if it has one, else the global table.
        let global = decoder.global_palette().map(<[u8]>::to_vec);
        let mut shared: Option<Vec<u8>> = None;
        let mut canvas = Canvas::new(u32::from(decoder.width()), u32::from(decoder.height()));
        let mut frames = Vec::new();

        while let Some(frame) = decoder.read_next_frame()? {
            let index = frames.len();
            if index == 0 {
                shared = frame.palette.clone().or_else(|| global.clone());
            }
            let palette = shared
                .as_deref()
                .ok_or(DecodeError::MissingPalette { frame: index })?;

            canvas.paint(
                index,
                &Patch {
                    left: u32::from(frame.left),
                    top: u32::from(frame.top),
                    width: u32::from(frame.width),
                    height: u32::from(frame.height),
                    indices: &frame.buffer,
                    palette,
                    transparent: frame.transparent,
                    dispose: frame.dispose,
                },
            )?;
            frames.push(self.finish(canvas.snapshot()));
        }

        if frames.is_empty() {
            return Err(DecodeError::NoFrames);
        }
        Ok(FrameSequence::new(frames))
    }

    /// Generic RGBA decode with no transparency reconstruction.
    pub fn decode_plain(&self, bytes: &[u8]) -> Result<FrameSequence, DecodeError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let frames = decoder.into_frames().collect_frames()?;
        if frames.is_empty() {
            return Err(DecodeError::NoFrames);
        }
        Ok(FrameSequence::new(
            frames
                .into_iter()
                .map(|f| self.finish(f.into_buffer()))
                .collect(),
        ))
    }

    /// Prepare a single still image the same way animation frames are.
    pub fn still(&self, image: RgbaImage) -> Frame {
        self.finish(image)
    }

    fn finish(&self, mut image: RgbaImage) -> Frame {
        // Premultiply before filtering, otherwise the palette color hidden
        // under transparent pixels bleeds into the edges.
        premultiply(&mut image);
        if image.dimensions() != (self.width, self.height) {
            image = imageops::resize(&image, self.width, self.height, self.filter);
            clamp_to_alpha(&mut image);
        }
        Frame {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        }
    }
}

fn premultiply(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let a = u16::from(px[3]);
        for c in 0..3 {
            px[c] = ((u16::from(px[c]) * a + 127) / 255) as u8;
        }
    }
}

/// Lanczos rings can push color above alpha, which is invalid when premultiplied.
fn clamp_to_alpha(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let a = px[3];
        for c in 0..3 {
            px[c] = px[c].min(a);
        }
    }
}

/// One indexed frame rectangle as stored in the file.
struct Patch<'a> {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    indices: &'a [u8],
    palette: &'a [u8],
    transparent: Option<u8>,
    dispose: DisposalMethod,
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

/// Disposal owed by the previous frame, applied before the next one draws.
struct Disposal {
    method: DisposalMethod,
    rect: Rect,
    saved: Option<RgbaImage>,
}

/// Logical-screen accumulator. Frames are partial updates on top of it.
struct Canvas {
    image: RgbaImage,
    pending: Option<Disposal>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            pending: None,
        }
    }

    fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }

    fn paint(&mut self, frame: usize, patch: &Patch<'_>) -> Result<(), DecodeError> {
        let (screen_w, screen_h) = self.image.dimensions();
        if patch.left + patch.width > screen_w || patch.top + patch.height > screen_h {
            return Err(DecodeError::OutOfBounds {
                frame,
                left: patch.left,
                top: patch.top,
                width: patch.width,
                height: patch.height,
                screen_w,
                screen_h,
            });
        }
        let expected = (patch.width * patch.height) as usize;
        if patch.indices.len() < expected {
            return Err(DecodeError::ShortBuffer {
                frame,
                expected,
                actual: patch.indices.len(),
            });
        }

        self.dispose_previous();

        let saved = (patch.dispose == DisposalMethod::Previous).then(|| self.image.clone());
        let colors = patch.palette.len() / 3;

        for y in 0..patch.height {
            for x in 0..patch.width {
                let index = patch.indices[(y * patch.width + x) as usize];
                if Some(index) == patch.transparent {
                    continue;
                }
                let c = usize::from(index);
                if c >= colors {
                    return Err(DecodeError::PaletteIndex {
                        frame,
                        index,
                        colors,
                    });
                }
                let rgb = &patch.palette[c * 3..c * 3 + 3];
                self.image.put_pixel(
                    patch.left + x,
                    patch.top + y,
                    Rgba([rgb[0], rgb[1], rgb[2], 255]),
                );
            }
        }

        self.pending = Some(Disposal {
            method: patch.dispose,
            rect: Rect {
                left: patch.left,
                top: patch.top,
                width: patch.width,
                height: patch.height,
            },
            saved,
        });
        Ok(())
    }

    fn dispose_previous(&mut self) {
        let Some(disposal) = self.pending.take() else {
            return;
        };
        match disposal.method {
            DisposalMethod::Background => {
                let r = disposal.rect;
                for y in r.top..r.top + r.height {
                    for x in r.left..r.left + r.width {
                        self.image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
                    }
                }
            }
            DisposalMethod::Previous => {
                if let Some(saved) = disposal.saved {
                    self.image = saved;
                }
            }
            DisposalMethod::Any | DisposalMethod::Keep => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    const RED: [u8; 3] = [255, 0, 0];
    const GREEN: [u8; 3] = [0, 255, 0];
    const BLUE: [u8; 3] = [0, 0, 255];
    const WHITE: [u8; 3] = [255, 255, 255];

    fn palette(colors: &[[u8; 3]]) -> Vec<u8> {
        colors.iter().flatten().copied().collect()
    }

    struct TestFrame {
        rect: (u16, u16, u16, u16),
        indices: Vec<u8>,
        transparent: Option<u8>,
        dispose: DisposalMethod,
        local: Option<Vec<u8>>,
    }

    impl TestFrame {
        fn full(w: u16, h: u16, indices: Vec<u8>) -> Self {
            Self {
                rect: (0, 0, w, h),
                indices,
                transparent: None,
                dispose: DisposalMethod::Keep,
                local: None,
            }
        }
    }

    fn encode(screen: (u16, u16), global: &[u8], frames: &[TestFrame]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, screen.0, screen.1, global).unwrap();
            for tf in frames {
                let mut frame = gif::Frame::default();
                frame.left = tf.rect.0;
                frame.top = tf.rect.1;
                frame.width = tf.rect.2;
                frame.height = tf.rect.3;
                frame.buffer = Cow::Borrowed(&tf.indices);
                frame.transparent = tf.transparent;
                frame.dispose = tf.dispose;
                frame.palette = tf.local.clone();
                encoder.write_frame(&frame).unwrap();
            }
        }
        out
    }

    #[test]
    fn transparent_index_becomes_zero_alpha() {
        let mut frame = TestFrame::full(2, 2, vec![0, 1, 2, 3]);
        frame.transparent = Some(0);
        let bytes = encode((2, 2), &palette(&[RED, GREEN, BLUE, WHITE]), &[frame]);

        let seq = FrameDecoder::new(2, 2).decode(&bytes).unwrap();
        let f = seq.get(0).unwrap();
        assert_eq!(f.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(f.pixel(1, 0), [0, 255, 0, 255]);
        assert_eq!(f.pixel(0, 1), [0, 0, 255, 255]);
        assert_eq!(f.pixel(1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn single_frame_source_gives_one_frame() {
        let bytes = encode((2, 2), &palette(&[RED, GREEN]), &[TestFrame::full(2, 2, vec![0; 4])]);
        let seq = FrameDecoder::new(2, 2).decode(&bytes).unwrap();
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn frames_are_scaled_to_target() {
        let frames: Vec<_> = (0..3).map(|_| TestFrame::full(8, 8, vec![1; 64])).collect();
        let bytes = encode((8, 8), &palette(&[RED, GREEN]), &frames);

        let seq = FrameDecoder::new(4, 4).decode(&bytes).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.size(), Some((4, 4)));
        let f = seq.get(2).unwrap();
        assert_eq!(f.pixels.len(), 4 * 4 * 4);
        let [r, g, b, a] = f.pixel(2, 2);
        assert_eq!((r, b), (0, 0));
        assert!(g >= 254 && a >= 254);
    }

    #[test]
    fn first_frame_local_palette_wins_over_placeholder_global() {
        // An empty global table still gets written, as two black entries.
        let mut frame = TestFrame::full(1, 1, vec![1]);
        frame.local = Some(vec![1, 2, 3, 9, 8, 7]);
        let bytes = encode((1, 1), &[], &[frame]);

        let seq = FrameDecoder::new(1, 1).decode(&bytes).unwrap();
        assert_eq!(seq.get(0).unwrap().pixel(0, 0), [9, 8, 7, 255]);
    }

    #[test]
    fn first_frame_palette_is_shared_by_later_frames() {
        let mut first = TestFrame::full(1, 1, vec![0]);
        first.local = Some(palette(&[BLUE, WHITE]));
        let mut second = TestFrame::full(1, 1, vec![1]);
        second.local = Some(palette(&[RED, RED]));
        let bytes = encode((1, 1), &palette(&[RED, GREEN]), &[first, second]);

        let seq = FrameDecoder::new(1, 1).decode(&bytes).unwrap();
        assert_eq!(seq.get(0).unwrap().pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(seq.get(1).unwrap().pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn global_palette_used_when_first_frame_has_none() {
        let bytes = encode((1, 1), &palette(&[RED, GREEN]), &[TestFrame::full(1, 1, vec![1])]);
        let seq = FrameDecoder::new(1, 1).decode(&bytes).unwrap();
        assert_eq!(seq.get(0).unwrap().pixel(0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn partial_frames_composite_over_previous() {
        let global = palette(&[RED, GREEN]);
        let base = TestFrame::full(2, 2, vec![0; 4]);
        let patch = TestFrame {
            rect: (0, 0, 1, 1),
            indices: vec![1],
            transparent: None,
            dispose: DisposalMethod::Keep,
            local: None,
        };
        let bytes = encode((2, 2), &global, &[base, patch]);

        let seq = FrameDecoder::new(2, 2).decode(&bytes).unwrap();
        let second = seq.get(1).unwrap();
        assert_eq!(second.pixel(0, 0), [0, 255, 0, 255]);
        assert_eq!(second.pixel(1, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn background_disposal_clears_to_transparent() {
        let global = palette(&[RED, GREEN]);
        let mut base = TestFrame::full(2, 2, vec![0; 4]);
        base.dispose = DisposalMethod::Background;
        let patch = TestFrame {
            rect: (0, 0, 1, 1),
            indices: vec![1],
            transparent: None,
            dispose: DisposalMethod::Keep,
            local: None,
        };
        let bytes = encode((2, 2), &global, &[base, patch]);

        let seq = FrameDecoder::new(2, 2).decode(&bytes).unwrap();
        let second = seq.get(1).unwrap();
        assert_eq!(second.pixel(0, 0), [0, 255, 0, 255]);
        assert_eq!(second.pixel(1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_index_is_a_frame_error() {
        let mut canvas = Canvas::new(1, 1);
        let pal = palette(&[RED, GREEN]);
        let err = canvas
            .paint(
                4,
                &Patch {
                    left: 0,
                    top: 0,
                    width: 1,
                    height: 1,
                    indices: &[7],
                    palette: &pal,
                    transparent: None,
                    dispose: DisposalMethod::Keep,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DecodeError::PaletteIndex { frame: 4, index: 7, colors: 2 }));
        assert!(err.is_frame_error());
    }

    #[test]
    fn oversized_rect_is_a_frame_error() {
        let mut canvas = Canvas::new(2, 2);
        let pal = palette(&[RED, GREEN]);
        let err = canvas
            .paint(
                0,
                &Patch {
                    left: 1,
                    top: 0,
                    width: 2,
                    height: 1,
                    indices: &[0, 0],
                    palette: &pal,
                    transparent: None,
                    dispose: DisposalMethod::Keep,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfBounds { .. }));
    }

    #[test]
    fn plain_decode_keeps_count_and_size() {
        let frames: Vec<_> = (0..2).map(|_| TestFrame::full(4, 4, vec![0; 16])).collect();
        let bytes = encode((4, 4), &palette(&[RED, GREEN]), &frames);

        let seq = FrameDecoder::new(2, 2).decode_plain(&bytes).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.size(), Some((2, 2)));
    }

    #[test]
    fn bad_index_falls_back_for_whole_sequence() {
        let frames: Vec<_> = (0..3).map(|_| TestFrame::full(2, 2, vec![3; 4])).collect();
        let bytes = encode((2, 2), &palette(&[RED, GREEN]), &frames);

        let seq = FrameDecoder::new(2, 2).decode(&bytes).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.size(), Some((2, 2)));
    }

    #[test]
    fn zero_frames_is_an_unrecoverable_error() {
        let bytes = encode((2, 2), &palette(&[RED, GREEN]), &[]);

        let err = FrameDecoder::new(2, 2).decode(&bytes).unwrap_err();
        assert!(!err.is_frame_error());

        let path = std::env::temp_dir().join(format!("deskpet-empty-{}.gif", std::process::id()));
        std::fs::write(&path, &bytes).unwrap();
        let seq = FrameDecoder::new(2, 2).load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(seq.is_empty());
    }

    #[test]
    fn garbage_is_not_recoverable() {
        let err = FrameDecoder::new(120, 120).decode(b"definitely not a gif").unwrap_err();
        assert!(!err.is_frame_error());
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let seq = FrameDecoder::new(120, 120).load(Path::new("/nonexistent/walk.gif"));
        assert!(seq.is_empty());
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        premultiply(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [100, 50, 25, 128]);
    }
}
