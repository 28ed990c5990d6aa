//! Format listing rules
//!
//! Reduces the engine's raw format dump to the two ordered candidate lists
//! the client UI presents: one video entry per resolution (mp4/avc1 only,
//! highest bitrate wins) and one audio entry per integer bitrate (m4a
//! preferred on ties).

use crate::engine::{MediaProbe, RawFormat};
use crate::types::{FormatEntry, FormatListing};
use std::collections::HashMap;

/// Build the client-facing format listing from a metadata probe
pub fn build_format_listing(probe: &MediaProbe) -> FormatListing {
    let mut video_by_res: HashMap<(u32, u32), FormatEntry> = HashMap::new();
    let mut audio_by_bitrate: HashMap<i64, FormatEntry> = HashMap::new();

    for format in &probe.formats {
        let Some(format_id) = format.format_id.as_deref() else {
            continue;
        };

        if is_listable_video(format) {
            // width/height checked by is_listable_video
            let key = (format.width.unwrap_or(0), format.height.unwrap_or(0));
            let keep = video_by_res
                .get(&key)
                .is_none_or(|prev| format.tbr.unwrap_or(0.0) > prev.tbr.unwrap_or(0.0));
            if keep {
                video_by_res.insert(key, video_entry(format_id, format));
            }
        }

        if let Some(bitrate_key) = audio_bitrate_key(format) {
            let keep = match audio_by_bitrate.get(&bitrate_key) {
                None => true,
                Some(prev) => {
                    // m4a wins a tie outright; otherwise higher tbr wins
                    let new_is_m4a = format.ext.as_deref() == Some("m4a");
                    let prev_is_m4a = prev.ext == "m4a";
                    (new_is_m4a && !prev_is_m4a)
                        || format.tbr.unwrap_or(0.0) > prev.tbr.unwrap_or(0.0)
                }
            };
            if keep {
                audio_by_bitrate.insert(bitrate_key, audio_entry(format_id, format));
            }
        }
    }

    let mut video: Vec<FormatEntry> = video_by_res.into_values().collect();
    video.sort_by(|a, b| {
        let area = |e: &FormatEntry| u64::from(e.width.unwrap_or(0)) * u64::from(e.height.unwrap_or(0));
        area(a)
            .cmp(&area(b))
            .then_with(|| a.tbr.unwrap_or(0.0).total_cmp(&b.tbr.unwrap_or(0.0)))
    });

    let mut audio_keys: Vec<i64> = audio_by_bitrate.keys().copied().collect();
    audio_keys.sort_unstable();
    let audio: Vec<FormatEntry> = audio_keys
        .into_iter()
        .filter_map(|k| audio_by_bitrate.remove(&k))
        .collect();

    FormatListing {
        id: probe.id.clone(),
        title: probe.title.clone(),
        duration_sec: probe.duration,
        video,
        audio,
    }
}

/// Video filter: mp4 container, avc1 codec family, known dimensions
fn is_listable_video(format: &RawFormat) -> bool {
    let has_video_codec = format
        .vcodec
        .as_deref()
        .is_some_and(|v| v != "none" && v.starts_with("avc1"));
    has_video_codec
        && format.ext.as_deref() == Some("mp4")
        && format.width.is_some_and(|w| w > 0)
        && format.height.is_some_and(|h| h > 0)
}

/// Audio filter key: integer-rounded bitrate for formats carrying audio
fn audio_bitrate_key(format: &RawFormat) -> Option<i64> {
    let acodec = format.acodec.as_deref()?;
    if acodec == "none" {
        return None;
    }
    let tbr = format.tbr?;
    if !tbr.is_finite() {
        return None;
    }
    Some(tbr.round() as i64)
}

fn video_entry(format_id: &str, format: &RawFormat) -> FormatEntry {
    FormatEntry {
        format_id: format_id.to_string(),
        ext: format.ext.clone().unwrap_or_default(),
        has_audio: format.acodec.as_deref().is_some_and(|a| a != "none"),
        width: format.width,
        height: format.height,
        fps: format.fps,
        tbr: format.tbr,
        vcodec: format.vcodec.clone(),
        acodec: format.acodec.clone(),
    }
}

fn audio_entry(format_id: &str, format: &RawFormat) -> FormatEntry {
    FormatEntry {
        format_id: format_id.to_string(),
        ext: format.ext.clone().unwrap_or_default(),
        has_audio: true,
        width: None,
        height: None,
        fps: None,
        tbr: format.tbr,
        vcodec: format.vcodec.clone(),
        acodec: format.acodec.clone(),
    }
}
