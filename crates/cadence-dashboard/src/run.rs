//! Dashboard main loop

use crate::{
    app::App,
    event::{self, command_for_key, AppEvent, Command},
    sink::DashboardSink,
    state::UiEvent,
    terminal, ui, DashboardConfig, Result,
};
use cadence_engine::Session;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Run the dashboard until the user quits
///
/// `sink` must be the sink the session reports to, and `events` its receiver.
/// The session is left in whatever state it was in; stopping it is up to
/// the caller.
pub async fn run(
    session: Session,
    sink: DashboardSink,
    events: UnboundedReceiver<UiEvent>,
    config: DashboardConfig,
) -> Result<()> {
    let mut app = App::new(session, sink, events, config);
    let tick = Duration::from_millis(app.config.tick_ms);

    let mut tui = terminal::init()?;
    let _guard = terminal::TerminalGuard::new();

    if app.config.autostart {
        app.dispatch(Command::Start);
    }

    while !app.should_quit {
        app.drain_events();
        if app.should_refresh() {
            app.refresh().await;
        }

        tui.draw(|frame| ui::draw(frame, &app))?;

        // Resize needs no handling: every pass redraws the full frame
        if let Some(AppEvent::Key(key)) = event::poll_event(tick)? {
            if let Some(command) = command_for_key(key) {
                app.dispatch(command);
            }
        }
    }

    terminal::restore()
}
