use minddrift_game::{Ending, GameSessionMachine, GameConfig, Question, SessionState, ZoneRegistry};
use minddrift_web::hud;
use minddrift_web::{DomPresenter, FetchGateway};

#[test]
fn presenter_starts_idle_with_no_cues() {
    let mut presenter = DomPresenter::new();
    assert!(presenter.take_cues().is_empty());
    let machine = GameSessionMachine::new(GameConfig::default(), presenter).unwrap();
    assert_eq!(machine.state(), SessionState::Idle);
}

#[test]
fn layout_tracks_extended_zones() {
    let mut zones = ZoneRegistry::new();
    zones
        .extend(vec![Question::new(1, "Alive?")], 150.0, 180.0)
        .unwrap();
    zones
        .extend(vec![Question::new(2, "Red?")], 700.0, 180.0)
        .unwrap();
    let markers = hud::zone_markers(zones.zones(), 20.0);
    let distances: Vec<f64> = markers.iter().map(|m| m.distance).collect();
    assert_eq!(distances, vec![150.0, 700.0]);
    let json = serde_json::to_value(&markers).unwrap();
    assert_eq!(json[1]["sign_distance"], 680.0);
    assert_eq!(json[1]["text"], "Red?");
}

#[test]
fn out_of_questions_message_mentions_count() {
    let message = hud::game_over_message(&Ending::OutOfQuestions { questions: 12 });
    assert!(message.contains("12"));
}

#[test]
fn gateway_keeps_custom_base_url() {
    let gateway = FetchGateway::new(Some("http://127.0.0.1:9000/".into()));
    assert_eq!(gateway.base_url(), "http://127.0.0.1:9000/");
}
