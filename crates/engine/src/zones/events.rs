use super::definition::ZoneId;

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneEvent {
    ZoneLoaded {
        zone: ZoneId,
        objects: usize,
        failed_parts: usize,
    },
    ZoneUnloaded {
        zone: ZoneId,
    },
    ZoneChanged {
        from: Option<ZoneId>,
        to: ZoneId,
    },
    TransitionStarted {
        from: ZoneId,
        to: ZoneId,
    },
    PreloadFinished {
        zone: ZoneId,
        warmed: usize,
        failed: usize,
    },
    ZoneDiscovered {
        zone: ZoneId,
    },
}

impl ZoneEvent {
    pub fn zone(&self) -> &ZoneId {
        match self {
            Self::ZoneLoaded { zone, .. }
            | Self::ZoneUnloaded { zone }
            | Self::PreloadFinished { zone, .. }
            | Self::ZoneDiscovered { zone } => zone,
            Self::ZoneChanged { to, .. } | Self::TransitionStarted { to, .. } => to,
        }
    }
}
