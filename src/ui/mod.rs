pub mod dropdown;
pub mod modal;
pub mod render;

pub use dropdown::{DropdownOption, PresetDropdown};
pub use modal::{Modal, ModalEffect, ModalKind, ModalState, Modals};
pub use render::{NullRenderer, Renderer, TextRenderer};
