pub(crate) mod controls;
pub(crate) mod hud;
