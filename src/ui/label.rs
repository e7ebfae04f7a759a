use crate::game::checkpoint::{Checkpoint, NextCheckpoint};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

const TEXT_CACHE_LIMIT: usize = 4096;

thread_local! {
    static HEIGHT_TEXT_CACHE: RefCell<HashMap<u32, Arc<str>>> = RefCell::new(HashMap::with_capacity(256));
}

#[inline(always)]
fn whole_units(v: f32) -> u32 {
    v.max(0.0).round() as u32
}

/// "123m" for a display height, shared between every label that shows the
/// same whole-unit value.
pub fn height_text(display_height: f32) -> Arc<str> {
    let key = whole_units(display_height);
    HEIGHT_TEXT_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(text) = cache.get(&key) {
            return text.clone();
        }
        let text: Arc<str> = Arc::<str>::from(format!("{key}m"));
        if cache.len() < TEXT_CACHE_LIMIT {
            cache.insert(key, text.clone());
        }
        text
    })
}

/// Agent label: name followed by its height.
pub fn indicator_label(name: &str, display_height: f32) -> String {
    format!("{name} {}", height_text(display_height))
}

pub fn next_checkpoint_label(next: &NextCheckpoint) -> String {
    format!("→ {} ({})", next.name, height_text(next.display_distance))
}

pub fn marker_label(checkpoint: &Checkpoint) -> String {
    format!("{} - {}", checkpoint.name, height_text(checkpoint.display_height))
}
