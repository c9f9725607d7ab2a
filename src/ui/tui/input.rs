use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::UiAction;
use crate::market_data::{PanDirection, Timeframe};
use crate::session::command_router::InteractiveCommand;
use crate::ui::ViewState;

/// Bars moved per arrow key press
const PAN_STEP: f64 = 5.0;
const ZOOM_IN: f64 = 0.8;
const ZOOM_OUT: f64 = 1.25;

/// Handle keyboard events for TUI, returning actions for the session manager
pub fn handle_key_event(view: &mut ViewState, key_event: KeyEvent) -> UiAction {
    if key_event.kind == KeyEventKind::Release {
        return UiAction::None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') | KeyCode::Char('d') = key_event.code {
            view.should_quit = true;
            return UiAction::QuitRequested;
        }
    }

    let command = match key_event.code {
        KeyCode::Char('q') => {
            view.should_quit = true;
            return UiAction::QuitRequested;
        }
        KeyCode::Left => InteractiveCommand::Pan { bars: -PAN_STEP },
        KeyCode::Right => InteractiveCommand::Pan { bars: PAN_STEP },
        KeyCode::Home => InteractiveCommand::Edge {
            direction: PanDirection::Past,
        },
        KeyCode::End => InteractiveCommand::Edge {
            direction: PanDirection::Future,
        },
        KeyCode::Char('+') | KeyCode::Char('=') => InteractiveCommand::Zoom { factor: ZOOM_IN },
        KeyCode::Char('-') => InteractiveCommand::Zoom { factor: ZOOM_OUT },
        KeyCode::Char('[') => InteractiveCommand::HoverStep { delta: -1 },
        KeyCode::Char(']') => InteractiveCommand::HoverStep { delta: 1 },
        KeyCode::Esc => InteractiveCommand::Hover { index: None },
        KeyCode::Char('r') => InteractiveCommand::Reset,
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            InteractiveCommand::Timeframe {
                timeframe: Timeframe::ALL[idx],
                tic_scope: None,
            }
        }
        KeyCode::Tab => {
            view.next_symbol();
            match view.current_symbol() {
                Some(symbol) => InteractiveCommand::Symbol {
                    symbol: symbol.clone(),
                },
                None => return UiAction::None,
            }
        }
        KeyCode::BackTab => {
            view.previous_symbol();
            match view.current_symbol() {
                Some(symbol) => InteractiveCommand::Symbol {
                    symbol: symbol.clone(),
                },
                None => return UiAction::None,
            }
        }
        _ => return UiAction::None,
    };

    UiAction::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view() -> ViewState {
        ViewState::new(vec!["005930".to_string(), "000660".to_string()], Timeframe::Daily, 1)
    }

    #[test]
    fn test_quit_keys() {
        let mut view = view();
        assert_eq!(handle_key_event(&mut view, key(KeyCode::Char('q'))), UiAction::QuitRequested);
        assert!(view.should_quit);

        let mut view = self::view();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(&mut view, ctrl_c), UiAction::QuitRequested);
    }

    #[test]
    fn test_tab_cycles_symbol() {
        let mut view = view();
        let action = handle_key_event(&mut view, key(KeyCode::Tab));
        assert_eq!(
            action,
            UiAction::Command(InteractiveCommand::Symbol {
                symbol: "000660".to_string()
            })
        );
    }

    #[test]
    fn test_number_keys_pick_timeframe() {
        let mut view = view();
        assert_eq!(
            handle_key_event(&mut view, key(KeyCode::Char('3'))),
            UiAction::Command(InteractiveCommand::Timeframe {
                timeframe: Timeframe::Weekly,
                tic_scope: None
            })
        );
        assert_eq!(handle_key_event(&mut view, key(KeyCode::Char('9'))), UiAction::None);
    }

    #[test]
    fn test_pan_and_hover_keys() {
        let mut view = view();
        assert_eq!(
            handle_key_event(&mut view, key(KeyCode::Left)),
            UiAction::Command(InteractiveCommand::Pan { bars: -PAN_STEP })
        );
        assert_eq!(
            handle_key_event(&mut view, key(KeyCode::Esc)),
            UiAction::Command(InteractiveCommand::Hover { index: None })
        );
    }
}
