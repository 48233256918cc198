use std::collections::HashMap;

use hybrid_graph::{
    Graph, GraphError, Leaf, LeafState, Machine, Result, StateBuilder, StateContext, StateMachine,
};

const NEXT: i32 = 1;
const LEAVE: i32 = 2;
const BACK: i32 = 3;
const SKIP: i32 = 4;

#[derive(Default)]
struct Board {
    enters: HashMap<&'static str, u32>,
    exits: HashMap<&'static str, u32>,
    updates: HashMap<&'static str, u32>,
    log: Vec<String>,
}

impl Board {
    fn entered(&self, name: &str) -> u32 {
        self.enters.get(name).copied().unwrap_or(0)
    }

    fn exited(&self, name: &str) -> u32 {
        self.exits.get(name).copied().unwrap_or(0)
    }

    fn updated(&self, name: &str) -> u32 {
        self.updates.get(name).copied().unwrap_or(0)
    }

    fn record_enter(&mut self, name: &'static str) {
        *self.enters.entry(name).or_default() += 1;
        self.log.push(format!("enter {name}"));
    }

    fn record_exit(&mut self, name: &'static str) {
        *self.exits.entry(name).or_default() += 1;
        self.log.push(format!("exit {name}"));
    }
}

macro_rules! counting_leaf {
    ($name:ident) => {
        #[derive(Default)]
        struct $name;

        impl LeafState<Board> for $name {
            fn on_enter(&self, ctx: &mut StateContext<'_, Board>) {
                ctx.record_enter(stringify!($name));
            }

            fn on_update(&self, ctx: &mut StateContext<'_, Board>) {
                *ctx.updates.entry(stringify!($name)).or_default() += 1;
            }

            fn on_exit(&self, board: &mut Board) {
                board.record_exit(stringify!($name));
            }
        }
    };
}

counting_leaf!(A);
counting_leaf!(B);
counting_leaf!(Away);

/// Innermost group cycling between two leaves.
#[derive(Default)]
struct Inner;

impl StateMachine<Board> for Inner {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states
            .set_initial_state::<Leaf<A>>()?
            .add_transition::<Leaf<A>, Leaf<B>>(NEXT)?
            .add_transition::<Leaf<B>, Leaf<A>>(NEXT)?;
        Ok(())
    }

    fn on_enter(&self, ctx: &mut StateContext<'_, Board>) {
        ctx.record_enter("Inner");
    }

    fn on_exit(&self, board: &mut Board) {
        board.record_exit("Inner");
    }
}

#[derive(Default)]
struct Middle;

impl StateMachine<Board> for Middle {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states.set_initial_state::<Machine<Inner>>()?;
        Ok(())
    }

    fn on_enter(&self, ctx: &mut StateContext<'_, Board>) {
        ctx.record_enter("Middle");
    }

    fn on_exit(&self, board: &mut Board) {
        board.record_exit("Middle");
    }
}

#[derive(Default)]
struct Outer;

impl StateMachine<Board> for Outer {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states.set_initial_state::<Machine<Middle>>()?;
        Ok(())
    }

    fn on_enter(&self, ctx: &mut StateContext<'_, Board>) {
        ctx.record_enter("Outer");
    }

    fn on_exit(&self, board: &mut Board) {
        board.record_exit("Outer");
    }
}

#[derive(Default)]
struct Nested;

impl StateMachine<Board> for Nested {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states
            .set_initial_state::<Machine<Outer>>()?
            .add_transition::<Machine<Outer>, Leaf<Away>>(LEAVE)?
            .add_transition::<Leaf<Away>, Machine<Outer>>(BACK)?;
        Ok(())
    }
}

#[test]
fn test_run_enters_ancestors_top_down() {
    let graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    assert!(graph.is_current::<A>());
    assert_eq!(graph.current_state_name(), "A");
    assert!(graph.is_active::<Outer>());
    assert!(graph.is_active::<Inner>());

    let board = graph.blackboard().lock();
    assert_eq!(
        board.log,
        vec!["enter Outer", "enter Middle", "enter Inner", "enter A"]
    );
}

/// Cycling inside a three-level group never re-fires the groups' hooks.
#[test]
fn test_group_enter_exit_fire_once_across_internal_transitions() {
    let mut graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    for _ in 0..10 {
        assert!(graph.send_trigger(NEXT).expect("graph is live"));
        graph.update().expect("update should succeed");
    }

    assert!(graph.is_current::<A>());
    {
        let board = graph.blackboard().lock();
        for group in ["Outer", "Middle", "Inner"] {
            assert_eq!(board.entered(group), 1, "{group} entered once");
            assert_eq!(board.exited(group), 0, "{group} never exited");
        }
        assert_eq!(board.entered("A"), 6);
        assert_eq!(board.entered("B"), 5);
    }

    assert!(graph.send_trigger(LEAVE).expect("graph is live"));
    graph.update().expect("update should succeed");

    assert!(graph.is_current::<Away>());
    let board = graph.blackboard().lock();
    for group in ["Outer", "Middle", "Inner"] {
        assert_eq!(board.exited(group), 1, "{group} exited once");
    }
    let tail: Vec<&str> = board.log.iter().rev().take(5).rev().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec!["exit A", "exit Inner", "exit Middle", "exit Outer", "enter Away"]
    );
}

/// A group transition is registered on every leaf inside the group.
#[test]
fn test_group_transition_fans_out_to_every_leaf() {
    let mut graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    graph.send_trigger(NEXT).expect("graph is live");
    graph.update().expect("update should succeed");
    assert!(graph.is_current::<B>());

    assert!(graph.send_trigger(LEAVE).expect("graph is live"));
    graph.update().expect("update should succeed");
    assert!(graph.is_current::<Away>());

    assert!(graph.send_trigger(BACK).expect("graph is live"));
    graph.update().expect("update should succeed");
    assert!(graph.is_current::<A>());

    let board = graph.blackboard().lock();
    assert_eq!(board.entered("Outer"), 2);
    assert_eq!(board.exited("Outer"), 1);
}

#[test]
fn test_unknown_trigger_is_rejected() {
    let mut graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    assert!(!graph.send_trigger(BACK).expect("graph is live"));
    graph.update().expect("update should succeed");
    assert!(graph.is_current::<A>());
}

#[test]
fn test_update_without_pending_transition_calls_on_update() {
    let mut graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    graph.update().expect("update should succeed");
    graph.update().expect("update should succeed");
    assert_eq!(graph.blackboard().lock().updated("A"), 2);

    graph.send_trigger(NEXT).expect("graph is live");
    graph.update().expect("update should succeed");

    let board = graph.blackboard().lock();
    assert_eq!(board.updated("A"), 2, "pending transition skips on_update");
    assert_eq!(board.updated("B"), 0);
    assert_eq!(graph.tick(), 3);
}

#[test]
fn test_last_trigger_before_update_wins() {
    let mut graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    assert!(graph.send_trigger(NEXT).expect("graph is live"));
    assert!(graph.send_trigger(LEAVE).expect("graph is live"));
    graph.update().expect("update should succeed");

    assert!(graph.is_current::<Away>());
    assert_eq!(graph.blackboard().lock().entered("B"), 0);
}

counting_leaf!(Start);
counting_leaf!(Done);

/// Leaf that immediately forwards to the next state from its own `on_enter`.
#[derive(Default)]
struct Guard;

impl LeafState<Board> for Guard {
    fn on_enter(&self, ctx: &mut StateContext<'_, Board>) {
        ctx.record_enter("Guard");
        assert!(ctx.send_trigger(SKIP));
    }

    fn on_exit(&self, board: &mut Board) {
        board.record_exit("Guard");
    }
}

#[derive(Default)]
struct Chain;

impl StateMachine<Board> for Chain {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states
            .set_initial_state::<Leaf<Start>>()?
            .add_transition::<Leaf<Start>, Leaf<Guard>>(NEXT)?
            .add_transition::<Leaf<Guard>, Leaf<Done>>(SKIP)?
            .add_transition::<Leaf<Done>, Leaf<Done>>(NEXT)?;
        Ok(())
    }
}

#[test]
fn test_transition_requested_from_on_enter_chains_in_same_update() {
    let mut graph = Graph::run::<Machine<Chain>>(Board::default()).expect("graph should start");

    graph.send_trigger(NEXT).expect("graph is live");
    graph.update().expect("update should succeed");

    assert!(graph.is_current::<Done>());
    let board = graph.blackboard().lock();
    assert_eq!(
        board.log,
        vec![
            "enter Start",
            "exit Start",
            "enter Guard",
            "exit Guard",
            "enter Done"
        ]
    );
}

#[test]
fn test_self_transition_reenters_leaf() {
    let mut graph = Graph::run::<Machine<Chain>>(Board::default()).expect("graph should start");
    graph.send_trigger(NEXT).expect("graph is live");
    graph.update().expect("update should succeed");

    graph.send_trigger(NEXT).expect("graph is live");
    graph.update().expect("update should succeed");

    assert!(graph.is_current::<Done>());
    let board = graph.blackboard().lock();
    assert_eq!(board.entered("Done"), 2);
    assert_eq!(board.exited("Done"), 1);
}

/// Starting straight into a forwarding state settles before `run` returns.
#[derive(Default)]
struct StartsInGuard;

impl StateMachine<Board> for StartsInGuard {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states
            .set_initial_state::<Leaf<Guard>>()?
            .add_transition::<Leaf<Guard>, Leaf<Done>>(SKIP)?;
        Ok(())
    }
}

#[test]
fn test_run_applies_transition_requested_while_entering() {
    let graph = Graph::run::<Machine<StartsInGuard>>(Board::default()).expect("graph should start");
    assert!(graph.is_current::<Done>());
}

#[derive(Default)]
struct DuplicateLeafTrigger;

impl StateMachine<Board> for DuplicateLeafTrigger {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states
            .set_initial_state::<Leaf<A>>()?
            .add_transition::<Leaf<A>, Leaf<B>>(NEXT)?
            .add_transition::<Leaf<A>, Leaf<Away>>(NEXT)?;
        Ok(())
    }
}

#[test]
fn test_duplicate_trigger_on_leaf_fails_setup() {
    let err = Graph::run::<Machine<DuplicateLeafTrigger>>(Board::default())
        .err()
        .expect("setup should fail");
    match err {
        GraphError::DuplicateTrigger { trigger, from, to } => {
            assert_eq!(trigger.0, NEXT);
            assert_eq!(from, "A");
            assert_eq!(to, "Away");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// `Inner` already connects NEXT on its leaves, so connecting NEXT from the
/// whole group collides.
#[derive(Default)]
struct DuplicateGroupTrigger;

impl StateMachine<Board> for DuplicateGroupTrigger {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states
            .set_initial_state::<Machine<Inner>>()?
            .add_transition::<Machine<Inner>, Leaf<Away>>(NEXT)?;
        Ok(())
    }
}

#[test]
fn test_duplicate_trigger_through_group_fails_setup() {
    let result = Graph::run::<Machine<DuplicateGroupTrigger>>(Board::default());
    assert!(matches!(
        result,
        Err(GraphError::DuplicateTrigger { .. })
    ));
}

#[derive(Default)]
struct NoInitialState;

impl StateMachine<Board> for NoInitialState {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states.add_transition::<Leaf<A>, Leaf<B>>(NEXT)?;
        Ok(())
    }
}

#[test]
fn test_missing_initial_state_fails_setup() {
    let result = Graph::run::<Machine<NoInitialState>>(Board::default());
    assert!(matches!(
        result,
        Err(GraphError::MissingInitialState { machine: "NoInitialState" })
    ));
}

#[derive(Default)]
struct TwoInitialStates;

impl StateMachine<Board> for TwoInitialStates {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states.set_initial_state::<Leaf<A>>()?;
        states.set_initial_state::<Leaf<B>>()?;
        Ok(())
    }
}

#[test]
fn test_initial_state_cannot_be_set_twice() {
    let result = Graph::run::<Machine<TwoInitialStates>>(Board::default());
    assert!(matches!(
        result,
        Err(GraphError::InitialStateAlreadySet { .. })
    ));
}

#[derive(Default)]
struct ContainsItself;

impl StateMachine<Board> for ContainsItself {
    fn setup_states(&self, states: &mut StateBuilder<'_, Board>) -> Result<()> {
        states.set_initial_state::<Machine<ContainsItself>>()?;
        Ok(())
    }
}

#[test]
fn test_recursive_machine_fails_setup() {
    let result = Graph::run::<Machine<ContainsItself>>(Board::default());
    assert!(matches!(
        result,
        Err(GraphError::RecursiveState { state: "ContainsItself" })
    ));
}

#[test]
fn test_disposed_graph_rejects_calls() {
    let mut graph = Graph::run::<Machine<Nested>>(Board::default()).expect("graph should start");

    graph.dispose().expect("first dispose succeeds");
    assert!(graph.is_disposed());
    assert!(matches!(graph.update(), Err(GraphError::Disposed)));
    assert!(matches!(graph.send_trigger(NEXT), Err(GraphError::Disposed)));
    assert!(matches!(graph.dispose(), Err(GraphError::Disposed)));

    let board = graph.blackboard().lock();
    assert_eq!(board.exited("A"), 0, "dispose does not run exit hooks");
}

#[test]
fn test_single_leaf_graph() {
    let mut graph = Graph::run::<Leaf<A>>(Board::default()).expect("graph should start");
    graph.update().expect("update should succeed");

    assert!(graph.is_current::<A>());
    assert!(!graph.send_trigger(NEXT).expect("graph is live"));
    assert_eq!(graph.blackboard().lock().updated("A"), 1);
}
