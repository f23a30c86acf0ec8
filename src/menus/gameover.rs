//! The game over menu.

use bevy::prelude::*;

use crate::{
    game::state::GameScore,
    menus::Menu,
    screens::Screen,
    theme::{palette::MENU_BACKGROUND, widget},
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Menu::GameOver), spawn_gameover_menu);
}

fn spawn_gameover_menu(mut commands: Commands, score: Res<GameScore>) {
    commands.spawn((
        widget::ui_root("Game Over Menu"),
        BackgroundColor(MENU_BACKGROUND),
        GlobalZIndex(2),
        DespawnOnExit(Menu::GameOver),
        children![
            widget::header("Game Over"),
            widget::label(format!(
                "Final score: {}   (level {})",
                score.score, score.level
            )),
            widget::button("Quit to title", quit_to_title),
        ],
    ));
}

fn quit_to_title(_: On<Pointer<Click>>, mut next_screen: ResMut<NextState<Screen>>) {
    next_screen.set(Screen::Title);
}
