use std::collections::HashMap;

use super::ChannelSource;

/// A logical image as the interchange writer will emit it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// An image table entry used as-is.
    Single { image: String },
    /// A tile set sharing one name; `images` lists the participating entries in first-use order.
    Udim {
        name: String,
        tiles: Vec<u32>,
        images: Vec<String>,
    },
    /// A new image assembled channel by channel.
    Packed { channels: Vec<ChannelSource> },
}

/// Session-scoped table of logical images. Indices are stable and handed out in
/// first-registration order.
#[derive(Clone, Debug, Default)]
pub struct ImageRegistry {
    sources: Vec<ImageSource>,
    index_by_source: HashMap<ImageSource, u32>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: ImageSource) -> u32 {
        if let Some(index) = self.index_by_source.get(&source) {
            return *index;
        }
        let index = self.sources.len() as u32;
        self.sources.push(source.clone());
        self.index_by_source.insert(source, index);
        index
    }

    pub fn get(&self, index: u32) -> Option<&ImageSource> {
        self.sources.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ImageSource)> {
        self.sources.iter().enumerate().map(|(i, s)| (i as u32, s))
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.index_by_source.clear();
    }
}
