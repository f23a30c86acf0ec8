use bevy::prelude::*;

/// Light text for the dark playfield HUD.
pub const HUD_TEXT: Color = Color::srgb(1.0, 0.84, 0.0);

/// Light text for labels on menu overlays.
pub const LABEL_TEXT: Color = Color::srgb(0.92, 0.92, 0.88);

/// Light text for headers.
pub const HEADER_TEXT: Color = Color::srgb(1.0, 0.84, 0.0);

/// White text for buttons.
pub const BUTTON_TEXT: Color = Color::srgb(0.98, 0.98, 0.96);
/// #ff8c00
pub const BUTTON_BACKGROUND: Color = Color::srgb(1.0, 0.55, 0.0);
/// #ffa500
pub const BUTTON_HOVERED_BACKGROUND: Color = Color::srgb(1.0, 0.65, 0.0);
/// #ff6500
pub const BUTTON_PRESSED_BACKGROUND: Color = Color::srgb(1.0, 0.4, 0.0);

/// Dark jungle green used behind the menus.
pub const MENU_BACKGROUND: Color = Color::srgba(0.06, 0.16, 0.1, 0.95);
