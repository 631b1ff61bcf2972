// SPDX-License-Identifier: GPL-3.0-only

//! Display surface and streaming sink abstractions

/// Reference to a display surface owned by the host shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceRef(pub u64);

/// Preview display view
///
/// Visibility changes make the host create or destroy the underlying surface;
/// those surface events reach the controller through the lifecycle channel.
pub trait DisplaySurface: Send {
    /// Surface this display renders into
    fn surface_ref(&self) -> SurfaceRef;

    /// Show or hide the preview
    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;
}

/// Network streaming sink
///
/// Receives the display surface once at setup and streams whatever is
/// rendered onto it. No frame-level logic depends on it.
pub trait StreamingSink: Send {
    fn attach_surface(&mut self, surface: SurfaceRef, orientation_degrees: u32);
}
