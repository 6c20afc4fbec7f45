use gridguide_core::{ChannelId, ChannelListFilter};

/// Which channel list the user picked in the guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSelection {
    AllChannels,
    List(ChannelListFilter),
}

impl FilterSelection {
    pub fn into_filter(self) -> Option<ChannelListFilter> {
        match self {
            Self::AllChannels => None,
            Self::List(filter) => Some(filter),
        }
    }
}

/// A viewport change reported by the renderer.
///
/// Geometry always replaces the previous viewport. `search_text` and `filter`
/// are only applied when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportRequest {
    pub scroll_offset_x: f64,
    pub scroll_offset_y: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub zoom_scale: f64,
    pub search_text: Option<String>,
    pub filter: Option<FilterSelection>,
    /// Keep this channel inside the channel window, recentring if needed.
    pub focus_channel: Option<ChannelId>,
}

impl ViewportRequest {
    pub fn new(scroll_offset_y: f64, viewport_height: f64, zoom_scale: f64) -> Self {
        Self {
            scroll_offset_y,
            viewport_height,
            zoom_scale,
            ..Self::default()
        }
    }

    pub fn with_horizontal(mut self, scroll_offset_x: f64, viewport_width: f64) -> Self {
        self.scroll_offset_x = scroll_offset_x;
        self.viewport_width = viewport_width;
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_filter(mut self, selection: FilterSelection) -> Self {
        self.filter = Some(selection);
        self
    }

    pub fn with_focus(mut self, channel_id: ChannelId) -> Self {
        self.focus_channel = Some(channel_id);
        self
    }

    pub(crate) fn same_geometry(&self, other: &Self) -> bool {
        self.scroll_offset_x == other.scroll_offset_x
            && self.scroll_offset_y == other.scroll_offset_y
            && self.viewport_width == other.viewport_width
            && self.viewport_height == other.viewport_height
            && self.zoom_scale == other.zoom_scale
    }
}
