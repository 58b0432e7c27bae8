/// Values the host shows above the play field.
///
/// `lives` is `None` for games without a life concept (the stacker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HudSnapshot {
    pub score: u32,
    pub lives: Option<u32>,
    pub level: u32,
    pub game_over: bool,
}

/// Outbox of HUD snapshots waiting for the host.
///
/// Games push after anything HUD-visible changes; pushes that repeat the
/// last queued snapshot are dropped so the host only sees real changes.
#[derive(Debug, Default)]
pub struct HudOutbox {
    last: Option<HudSnapshot>,
    pending: Vec<HudSnapshot>,
}

impl HudOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `snap` unconditionally. Used by `init`, which always emits once.
    pub fn force(&mut self, snap: HudSnapshot) {
        self.last = Some(snap);
        self.pending.push(snap);
    }

    pub fn push(&mut self, snap: HudSnapshot) {
        if self.last != Some(snap) {
            self.force(snap);
        }
    }

    pub fn drain(&mut self) -> Vec<HudSnapshot> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.last = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(score: u32) -> HudSnapshot {
        HudSnapshot { score, lives: Some(3), level: 1, game_over: false }
    }

    #[test]
    fn push_drops_repeats() {
        let mut outbox = HudOutbox::new();
        outbox.push(snap(0));
        outbox.push(snap(0));
        outbox.push(snap(10));
        assert_eq!(outbox.drain(), vec![snap(0), snap(10)]);
        assert!(outbox.drain().is_empty());
    }

    #[test]
    fn force_always_queues() {
        let mut outbox = HudOutbox::new();
        outbox.force(snap(0));
        outbox.force(snap(0));
        assert_eq!(outbox.drain().len(), 2);
    }

    #[test]
    fn repeat_after_drain_is_still_dropped() {
        let mut outbox = HudOutbox::new();
        outbox.push(snap(5));
        outbox.drain();
        outbox.push(snap(5));
        assert!(outbox.drain().is_empty());
    }
}
