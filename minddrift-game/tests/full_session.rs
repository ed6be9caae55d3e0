use async_trait::async_trait;
use futures::executor::block_on;
use minddrift_game::{
    Answer, BackendGateway, BackendRequest, CarPosition, Delivery, Ending, GameConfig,
    GameSessionMachine, GatewayError, PendingRequest, Prediction, PredictionArtifact,
    PredictionSource, PresentationPort, Question, SessionState, SoundCue, TickOutcome,
    answers_key, dispatch,
};
use std::cell::RefCell;
use std::collections::VecDeque;

#[derive(Default)]
struct ScriptedGateway {
    batches: RefCell<VecDeque<Vec<Question>>>,
    guesses: RefCell<VecDeque<String>>,
    predict_calls: RefCell<Vec<Vec<String>>>,
    continue_calls: RefCell<Vec<Vec<String>>>,
    reports: RefCell<Vec<(String, String)>>,
}

impl ScriptedGateway {
    fn new(batches: Vec<Vec<Question>>, guesses: &[&str]) -> Self {
        Self {
            batches: RefCell::new(batches.into()),
            guesses: RefCell::new(guesses.iter().map(|g| (*g).to_string()).collect()),
            ..Self::default()
        }
    }

    fn next_batch(&self) -> Vec<Question> {
        self.batches.borrow_mut().pop_front().unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl BackendGateway for ScriptedGateway {
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, GatewayError> {
        Ok(self.next_batch())
    }

    async fn fetch_prediction(&self, answers: &[String]) -> Result<Prediction, GatewayError> {
        self.predict_calls.borrow_mut().push(answers.to_vec());
        let label = self
            .guesses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| GatewayError::InvalidResponse("no guess scripted".into()))?;
        Ok(Prediction {
            artifact: PredictionArtifact::Html(format!("<h1>{label}</h1>")),
            label,
            source: PredictionSource::Ai,
        })
    }

    async fn fetch_continuation(&self, answers: &[String]) -> Result<Vec<Question>, GatewayError> {
        self.continue_calls.borrow_mut().push(answers.to_vec());
        Ok(self.next_batch())
    }

    async fn report_success(
        &self,
        answers: &[String],
        prediction: &Prediction,
    ) -> Result<(), GatewayError> {
        self.reports
            .borrow_mut()
            .push((answers_key(answers), prediction.label.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Track {
    car: CarPosition,
    states: Vec<SessionState>,
    cues: Vec<SoundCue>,
    messages: Vec<String>,
    placed: Vec<f64>,
    shown: Option<String>,
}

impl PresentationPort for Track {
    fn car_position(&self) -> CarPosition {
        self.car
    }

    fn on_progress(&mut self, _resolved: usize, _total: usize, _current: Option<&str>) {}

    fn on_state_changed(&mut self, state: SessionState) {
        self.states.push(state);
    }

    fn on_zones_added(&mut self, zones: &[minddrift_game::DecisionZone]) {
        self.placed.extend(zones.iter().map(|zone| zone.position));
    }

    fn on_prediction(&mut self, prediction: &Prediction) {
        self.shown = Some(prediction.label.clone());
    }

    fn on_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn on_cue(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }
}

fn questions(texts: &[&str]) -> Vec<Question> {
    texts
        .iter()
        .zip(1_i64..)
        .map(|(text, id)| Question::new(id, *text))
        .collect()
}

fn run(
    machine: &mut GameSessionMachine<Track>,
    gateway: &ScriptedGateway,
    pending: PendingRequest,
) -> Delivery {
    let reply = block_on(dispatch(gateway, &pending.request));
    machine.deliver(pending.ticket, reply).unwrap()
}

/// Drive forward in fixed steps, steering by the pending zone index, until
/// the round ends. Returns the prediction request issued by the last zone.
fn drive_round(
    machine: &mut GameSessionMachine<Track>,
    step: f64,
    steer: impl Fn(usize) -> f64,
) -> PendingRequest {
    let mut distance = machine.port().car.distance;
    for _ in 0..10_000 {
        distance += step;
        let lateral = steer(machine.zones().resolved_count());
        machine.port_mut().car = CarPosition::new(distance, lateral);
        match machine.tick().unwrap() {
            TickOutcome::Finished { request, .. } => return request,
            TickOutcome::Answered(_) | TickOutcome::Driving => {
                assert_eq!(machine.answers().len(), machine.zones().resolved_count());
            }
            TickOutcome::Inactive => panic!("left Playing without finishing"),
        }
    }
    panic!("round never finished");
}

fn lane(answer: Answer) -> f64 {
    match answer {
        Answer::Yes => 7.5,
        Answer::Partial => 0.0,
        Answer::No => -7.5,
    }
}

#[test]
fn confirmed_guess_after_first_round() {
    let gateway = ScriptedGateway::new(vec![questions(&["Q1", "Q2", "Q3"])], &["Cat"]);
    let mut machine = GameSessionMachine::new(GameConfig::default(), Track::default()).unwrap();

    let start = machine.start().unwrap();
    assert_eq!(run(&mut machine, &gateway, start), Delivery::Applied);
    assert_eq!(machine.port().placed, vec![150.0, 330.0, 510.0]);

    let plan = [Answer::Yes, Answer::Partial, Answer::No];
    let predict = drive_round(&mut machine, 0.8, |index| lane(plan[index.min(2)]));
    assert_eq!(
        machine.answers(),
        ["Q1: Yes", "Q2: Partial", "Q3: No"].map(String::from)
    );

    assert_eq!(run(&mut machine, &gateway, predict), Delivery::Applied);
    assert_eq!(machine.state(), SessionState::ResultShown);
    assert_eq!(machine.port().shown.as_deref(), Some("Cat"));
    assert_eq!(gateway.predict_calls.borrow().len(), 1);

    let report = machine.confirm_correct().unwrap();
    assert_eq!(
        machine.ending(),
        Some(&Ending::Guessed {
            questions: 3,
            label: "Cat".into()
        })
    );
    assert_eq!(
        machine.port().states,
        [
            SessionState::Loading,
            SessionState::Playing,
            SessionState::Predicting,
            SessionState::ResultShown,
            SessionState::Ended
        ]
    );
    assert_eq!(run(&mut machine, &gateway, report), Delivery::Acknowledged);
    assert_eq!(
        gateway.reports.borrow().as_slice(),
        [("Q1: Yes|Q2: Partial|Q3: No".to_string(), "Cat".to_string())]
    );
    assert_eq!(
        machine.port().cues,
        [
            SoundCue::Click,
            SoundCue::Answer,
            SoundCue::Answer,
            SoundCue::Answer,
            SoundCue::Thinking,
            SoundCue::Win
        ]
    );
}

#[test]
fn rejected_guess_extends_the_same_track() {
    let gateway = ScriptedGateway::new(
        vec![questions(&["Q1", "Q2"]), questions(&["Q3", "Q4"])],
        &["Dog", "Cat"],
    );
    let mut machine = GameSessionMachine::new(GameConfig::default(), Track::default()).unwrap();
    let start = machine.start().unwrap();
    run(&mut machine, &gateway, start);

    let predict = drive_round(&mut machine, 1.0, |_| 7.5);
    run(&mut machine, &gateway, predict);
    let stopped_at = machine.port().car.distance;

    let more = machine.confirm_incorrect().unwrap();
    assert_eq!(
        more.request,
        BackendRequest::Continuation {
            answers: vec!["Q1: Yes".into(), "Q2: Yes".into()]
        }
    );
    assert_eq!(machine.zones().pending_count(), 0);
    run(&mut machine, &gateway, more);
    assert_eq!(machine.state(), SessionState::Playing);
    assert_eq!(machine.zones().len(), 4);
    assert_eq!(machine.zones().pending_count(), 2);
    assert_eq!(machine.zones().resolved_count(), 2);
    assert_eq!(machine.answers().len(), 2);

    // The car stopped just short of the last zone at 330, so the track keeps
    // its spacing from there.
    let added = &machine.zones().zones()[2..];
    assert!(added[0].position > stopped_at);
    assert!((added[0].position - 330.0 - 180.0).abs() < f64::EPSILON);
    assert!((added[1].position - added[0].position - 180.0).abs() < f64::EPSILON);

    let predict = drive_round(&mut machine, 1.0, |_| -7.5);
    let BackendRequest::Prediction { answers } = &predict.request else {
        panic!("expected a prediction request");
    };
    assert_eq!(answers, &["Q1: Yes", "Q2: Yes", "Q3: No", "Q4: No"]);
    run(&mut machine, &gateway, predict);
    assert_eq!(machine.port().shown.as_deref(), Some("Cat"));
    assert_eq!(gateway.continue_calls.borrow().len(), 1);
}

#[test]
fn follow_up_batch_lands_ahead_of_a_car_that_kept_driving() {
    let gateway = ScriptedGateway::new(
        vec![questions(&["Q1"]), questions(&["Q2", "Q3"])],
        &["Dog", "Cat"],
    );
    let mut machine = GameSessionMachine::new(GameConfig::default(), Track::default()).unwrap();
    let start = machine.start().unwrap();
    run(&mut machine, &gateway, start);
    let predict = drive_round(&mut machine, 1.0, |_| 0.0);
    run(&mut machine, &gateway, predict);

    let more = machine.confirm_incorrect().unwrap();
    machine.port_mut().car = CarPosition::new(1500.0, 0.0);
    run(&mut machine, &gateway, more);
    assert_eq!(machine.port().placed[1..], [1650.0, 1830.0]);

    assert_eq!(machine.tick().unwrap(), TickOutcome::Driving);
    assert_eq!(machine.answers(), ["Q1: Partial".to_string()]);
    let predict = drive_round(&mut machine, 1.0, |_| 7.5);
    run(&mut machine, &gateway, predict);
    assert_eq!(
        gateway.predict_calls.borrow().last().map(Vec::as_slice),
        Some(["Q1: Partial", "Q2: Yes", "Q3: Yes"].map(String::from).as_slice())
    );
    assert_eq!(machine.port().shown.as_deref(), Some("Cat"));
}

#[test]
fn coarse_frames_still_answer_every_zone_in_order() {
    let texts: Vec<String> = (1..=6).map(|n| format!("Q{n}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let gateway = ScriptedGateway::new(vec![questions(&refs)], &["Lamp"]);
    let mut machine = GameSessionMachine::new(GameConfig::default(), Track::default()).unwrap();
    let start = machine.start().unwrap();
    run(&mut machine, &gateway, start);

    // 50 units per frame overshoots the 2-unit window around every zone.
    let predict = drive_round(&mut machine, 50.0, |index| {
        if index % 2 == 0 { 7.5 } else { -7.5 }
    });
    let expected: Vec<String> = refs
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{q}: {}", if i % 2 == 0 { "Yes" } else { "No" }))
        .collect();
    assert_eq!(machine.answers(), expected.as_slice());
    assert!(matches!(
        predict.request,
        BackendRequest::Prediction { ref answers } if answers.len() == 6
    ));
}

#[test]
fn empty_opening_batch_keeps_the_player_idle() {
    let gateway = ScriptedGateway::new(Vec::new(), &[]);
    let mut machine = GameSessionMachine::new(GameConfig::default(), Track::default()).unwrap();
    let start = machine.start().unwrap();
    run(&mut machine, &gateway, start);
    assert_eq!(machine.state(), SessionState::Idle);
    assert!(machine.zones().is_empty());
    assert_eq!(machine.port().messages.len(), 1);
    assert!(machine.start().is_ok());
}

#[test]
fn empty_follow_up_ends_with_question_count() {
    let gateway = ScriptedGateway::new(vec![questions(&["Q1"])], &["Dog"]);
    let mut machine = GameSessionMachine::new(GameConfig::default(), Track::default()).unwrap();
    let start = machine.start().unwrap();
    run(&mut machine, &gateway, start);
    let predict = drive_round(&mut machine, 1.0, |_| 0.0);
    run(&mut machine, &gateway, predict);
    let more = machine.confirm_incorrect().unwrap();
    run(&mut machine, &gateway, more);

    assert_eq!(machine.state(), SessionState::Ended);
    assert_eq!(
        machine.ending(),
        Some(&Ending::OutOfQuestions { questions: 1 })
    );
    machine.reset().unwrap();
    assert_eq!(machine.state(), SessionState::Idle);
    assert!(machine.answers().is_empty());
}
