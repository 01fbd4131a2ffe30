//! Output geometry and FFmpeg filter definitions shared by the engines.

use serde::{Deserialize, Serialize};

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Smallest dimensions >= these that yuv420p can encode (both even).
    pub fn even(&self) -> Self {
        Self {
            width: round_up_even(self.width),
            height: round_up_even(self.height),
        }
    }

    pub fn is_even(&self) -> bool {
        self.width % 2 == 0 && self.height % 2 == 0
    }
}

fn round_up_even(v: u32) -> u32 {
    v + (v % 2)
}

/// Target geometry for a trim.
///
/// Height is kept; width is recomputed from the source aspect ratio so
/// integer rounding never drifts the picture shape.
pub fn trim_geometry(source_width: u32, source_height: u32) -> Geometry {
    let height = source_height.max(1);
    let width = (height as f64 * source_width as f64 / height as f64).round() as u32;
    Geometry::new(width.max(1), height)
}

/// Canvas for a merge: the largest width and height across inputs.
pub fn merge_canvas<I>(sizes: I) -> Geometry
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let (width, height) = sizes
        .into_iter()
        .fold((0, 0), |(w, h), (sw, sh)| (w.max(sw), h.max(sh)));
    Geometry::new(width.max(2), height.max(2)).even()
}

/// Video filter for a trim.
///
/// Scales to the target geometry and, when a dimension is odd, pads one
/// pixel (never scales) to reach an encodable size.
pub fn filter_trim(target: Geometry) -> String {
    let encoded = target.even();
    let mut filter = format!("scale={}:{}", target.width, target.height);
    if !target.is_even() {
        filter.push_str(&format!(",pad={}:{}:0:0", encoded.width, encoded.height));
    }
    filter.push_str(",setsar=1");
    filter
}

/// Letterbox input `index` into `canvas` at a common frame rate.
///
/// Output label: `[v{index}]`.
pub fn filter_letterbox(index: usize, canvas: Geometry, fps: f64) -> String {
    format!(
        "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps:.3},format=yuv420p,\
         setpts=PTS-STARTPTS[v{i}]",
        i = index,
        w = canvas.width,
        h = canvas.height,
        fps = fps,
    )
}

/// Normalize an audio stream to a common format and pin it to `duration`.
///
/// `source` is an input stream specifier such as `0:a`. Output label:
/// `[a{index}]`.
pub fn filter_audio_segment(
    source: &str,
    index: usize,
    duration: f64,
    sample_rate: u32,
    layout: &str,
) -> String {
    format!(
        "[{src}]aresample={rate},aformat=sample_fmts=fltp:channel_layouts={layout},\
         apad,atrim=0:{dur:.3},asetpts=PTS-STARTPTS[a{i}]",
        src = source,
        rate = sample_rate,
        layout = layout,
        dur = duration,
        i = index,
    )
}

/// Concatenate `count` labelled segment pairs into `[outv][outa]`.
pub fn filter_concat(count: usize) -> String {
    let mut filter = String::new();
    for i in 0..count {
        filter.push_str(&format!("[v{i}][a{i}]"));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=1[outv][outa]", count));
    filter
}

/// Silent source for inputs without audio.
pub fn lavfi_silence(sample_rate: u32, layout: &str) -> String {
    format!("anullsrc=channel_layout={}:sample_rate={}", layout, sample_rate)
}
