//! Open/close lifecycle for the settings and field-editor popups.
//!
//! Each transition returns the effects a presentation layer must carry out
//! (class changes, focus, timers). Nothing here touches a real UI.

use std::time::Duration;

use crate::model::config::UiConfig;

/// Default length of the close animation
pub const CLOSE_ANIMATION: Duration = Duration::from_millis(200);

pub const OPEN_CLASS: &str = "is-open";
pub const CLOSING_CLASS: &str = "is-closing";

/// Which popup a modal drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Settings,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Idle,
    Open,
    Closing,
}

/// A side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEffect {
    SetVisible(bool),
    AddClass(&'static str),
    RemoveClass(&'static str),
    FocusFirstInput,
    /// Call [`Modal::animation_finished`] once this elapses
    StartTimer(Duration),
}

/// One popup's lifecycle: Idle → Open → Closing → Idle
#[derive(Debug, Clone)]
pub struct Modal {
    pub kind: ModalKind,
    state: ModalState,
    has_element: bool,
    close_animation: Duration,
}

impl Modal {
    pub fn new(kind: ModalKind) -> Self {
        Modal {
            kind,
            state: ModalState::Idle,
            has_element: true,
            close_animation: CLOSE_ANIMATION,
        }
    }

    pub fn with_close_animation(mut self, duration: Duration) -> Self {
        self.close_animation = duration;
        self
    }

    /// Mark whether the popup element exists in the presentation layer
    pub fn set_has_element(&mut self, has_element: bool) {
        self.has_element = has_element;
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ModalState::Open
    }

    /// Show the popup. Ignored while closing or when there is no element.
    pub fn open(&mut self) -> Vec<ModalEffect> {
        if self.state == ModalState::Closing || !self.has_element {
            return Vec::new();
        }
        if self.state == ModalState::Open {
            return vec![ModalEffect::FocusFirstInput];
        }
        self.state = ModalState::Open;
        vec![
            ModalEffect::SetVisible(true),
            ModalEffect::AddClass(OPEN_CLASS),
            ModalEffect::FocusFirstInput,
        ]
    }

    /// Start hiding the popup. Ignored while already closing or idle.
    pub fn close(&mut self) -> Vec<ModalEffect> {
        if self.state != ModalState::Open {
            return Vec::new();
        }
        self.state = ModalState::Closing;
        vec![
            ModalEffect::RemoveClass(OPEN_CLASS),
            ModalEffect::AddClass(CLOSING_CLASS),
            ModalEffect::StartTimer(self.close_animation),
        ]
    }

    /// The close timer fired
    pub fn animation_finished(&mut self) -> Vec<ModalEffect> {
        if self.state != ModalState::Closing {
            return Vec::new();
        }
        self.state = ModalState::Idle;
        vec![
            ModalEffect::RemoveClass(CLOSING_CLASS),
            ModalEffect::SetVisible(false),
        ]
    }
}

/// The two independent popups of the panel
#[derive(Debug, Clone)]
pub struct Modals {
    pub settings: Modal,
    pub field: Modal,
}

impl Modals {
    pub fn new(close_animation: Duration) -> Self {
        Modals {
            settings: Modal::new(ModalKind::Settings).with_close_animation(close_animation),
            field: Modal::new(ModalKind::Field).with_close_animation(close_animation),
        }
    }

    pub fn from_config(ui: &UiConfig) -> Self {
        Self::new(ui.close_animation())
    }

    pub fn get_mut(&mut self, kind: ModalKind) -> &mut Modal {
        match kind {
            ModalKind::Settings => &mut self.settings,
            ModalKind::Field => &mut self.field,
        }
    }
}

impl Default for Modals {
    fn default() -> Self {
        Self::new(CLOSE_ANIMATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_cycle() {
        let mut modal = Modal::new(ModalKind::Settings);
        assert_eq!(
            modal.open(),
            vec![
                ModalEffect::SetVisible(true),
                ModalEffect::AddClass(OPEN_CLASS),
                ModalEffect::FocusFirstInput,
            ]
        );
        assert_eq!(modal.state(), ModalState::Open);

        assert_eq!(
            modal.close(),
            vec![
                ModalEffect::RemoveClass(OPEN_CLASS),
                ModalEffect::AddClass(CLOSING_CLASS),
                ModalEffect::StartTimer(CLOSE_ANIMATION),
            ]
        );
        assert_eq!(modal.state(), ModalState::Closing);

        assert_eq!(
            modal.animation_finished(),
            vec![ModalEffect::RemoveClass(CLOSING_CLASS), ModalEffect::SetVisible(false)]
        );
        assert_eq!(modal.state(), ModalState::Idle);
    }

    #[test]
    fn closing_blocks_reentry() {
        let mut modal = Modal::new(ModalKind::Field);
        modal.open();
        modal.close();
        assert!(modal.open().is_empty());
        assert!(modal.close().is_empty());
        assert_eq!(modal.state(), ModalState::Closing);

        modal.animation_finished();
        assert!(!modal.open().is_empty());
    }

    #[test]
    fn open_without_element_is_ignored() {
        let mut modal = Modal::new(ModalKind::Field);
        modal.set_has_element(false);
        assert!(modal.open().is_empty());
        assert_eq!(modal.state(), ModalState::Idle);
    }

    #[test]
    fn stray_timer_and_idle_close_are_ignored() {
        let mut modal = Modal::new(ModalKind::Settings);
        assert!(modal.close().is_empty());
        assert!(modal.animation_finished().is_empty());
        modal.open();
        assert!(modal.animation_finished().is_empty());
        assert!(modal.is_open());
    }

    #[test]
    fn modals_are_independent() {
        let mut modals = Modals::new(Duration::from_millis(50));
        modals.settings.open();
        modals.settings.close();
        assert_eq!(
            modals.get_mut(ModalKind::Field).open().first(),
            Some(&ModalEffect::SetVisible(true))
        );
        assert_eq!(modals.settings.state(), ModalState::Closing);
        assert_eq!(modals.field.state(), ModalState::Open);
    }

    #[test]
    fn config_sets_close_duration() {
        let ui: UiConfig = toml::from_str("close_animation_ms = 350").unwrap();
        let mut modals = Modals::from_config(&ui);
        modals.field.open();
        assert_eq!(
            modals.field.close().last(),
            Some(&ModalEffect::StartTimer(Duration::from_millis(350)))
        );
    }

    #[test]
    fn custom_close_duration_is_reported() {
        let mut modal = Modal::new(ModalKind::Settings).with_close_animation(Duration::from_millis(5));
        modal.open();
        assert!(modal.close().contains(&ModalEffect::StartTimer(Duration::from_millis(5))));
    }
}
