//! Vending machine driven purely by a state machine.
//!
//! States request their own follow-up transitions from `on_enter` and
//! `on_update`, so every public operation settles within a single update.
use hybrid_graph::{
    Graph, Leaf, LeafState, Machine, Result, StateBuilder, StateContext, StateMachine, Trigger,
};

const JUICE_PRICE: u32 = 3;

#[derive(Debug, Clone, Copy)]
#[repr(i32)]
enum VendingTrigger {
    CoinInserted,
    PriceReached,
    PriceMissed,
    DispenseRequested,
    ChangeRequested,
    ChangeReturned,
}

impl From<VendingTrigger> for Trigger {
    fn from(trigger: VendingTrigger) -> Self {
        Trigger(trigger as i32)
    }
}

#[derive(Debug, Default)]
struct Vending {
    coins: u32,
    juices_dispensed: u32,
    coins_returned: u32,
    visited: Vec<&'static str>,
}

#[derive(Default)]
struct Locked;

impl LeafState<Vending> for Locked {
    fn on_enter(&self, ctx: &mut StateContext<'_, Vending>) {
        ctx.visited.push("Locked");
    }
}

#[derive(Default)]
struct NotEnoughMoney;

impl LeafState<Vending> for NotEnoughMoney {
    fn on_enter(&self, ctx: &mut StateContext<'_, Vending>) {
        ctx.visited.push("NotEnoughMoney");
        if ctx.coins >= JUICE_PRICE {
            ctx.send_trigger(VendingTrigger::PriceReached);
        }
    }

    fn on_update(&self, ctx: &mut StateContext<'_, Vending>) {
        if ctx.coins >= JUICE_PRICE {
            ctx.send_trigger(VendingTrigger::PriceReached);
        }
    }
}

#[derive(Default)]
struct EnoughMoney;

impl LeafState<Vending> for EnoughMoney {
    fn on_enter(&self, ctx: &mut StateContext<'_, Vending>) {
        ctx.visited.push("EnoughMoney");
    }
}

#[derive(Default)]
struct Dispensing;

impl LeafState<Vending> for Dispensing {
    fn on_enter(&self, ctx: &mut StateContext<'_, Vending>) {
        ctx.visited.push("Dispensing");
        ctx.juices_dispensed += 1;
        ctx.coins -= JUICE_PRICE;

        if ctx.coins >= JUICE_PRICE {
            ctx.send_trigger(VendingTrigger::PriceReached);
        } else {
            ctx.send_trigger(VendingTrigger::PriceMissed);
        }
    }
}

#[derive(Default)]
struct ReturningChange;

impl LeafState<Vending> for ReturningChange {
    fn on_enter(&self, ctx: &mut StateContext<'_, Vending>) {
        ctx.visited.push("ReturningChange");
        let coins = std::mem::take(&mut ctx.coins);
        ctx.coins_returned += coins;
        ctx.send_trigger(VendingTrigger::ChangeReturned);
    }
}

#[derive(Default)]
struct VendingMachine;

impl StateMachine<Vending> for VendingMachine {
    fn setup_states(&self, states: &mut StateBuilder<'_, Vending>) -> Result<()> {
        use VendingTrigger::*;

        states
            .set_initial_state::<Leaf<Locked>>()?
            .add_transition::<Leaf<Locked>, Leaf<NotEnoughMoney>>(CoinInserted)?
            .add_transition::<Leaf<NotEnoughMoney>, Leaf<EnoughMoney>>(PriceReached)?
            .add_transition::<Leaf<NotEnoughMoney>, Leaf<ReturningChange>>(ChangeRequested)?
            .add_transition::<Leaf<EnoughMoney>, Leaf<ReturningChange>>(ChangeRequested)?
            .add_transition::<Leaf<EnoughMoney>, Leaf<Dispensing>>(DispenseRequested)?
            .add_transition::<Leaf<Dispensing>, Leaf<EnoughMoney>>(PriceReached)?
            .add_transition::<Leaf<Dispensing>, Leaf<ReturningChange>>(PriceMissed)?
            .add_transition::<Leaf<ReturningChange>, Leaf<Locked>>(ChangeReturned)?;
        Ok(())
    }
}

struct VendingHarness {
    graph: Graph<Vending>,
}

impl VendingHarness {
    fn new() -> Self {
        let graph =
            Graph::run::<Machine<VendingMachine>>(Vending::default()).expect("machine should start");
        Self { graph }
    }

    fn insert(&mut self, coins: u32) {
        self.graph.blackboard().lock().coins += coins;
        self.graph
            .send_trigger(VendingTrigger::CoinInserted)
            .expect("machine is live");
        self.graph.update().expect("update should succeed");
    }

    fn push_juice(&mut self) {
        self.graph
            .send_trigger(VendingTrigger::DispenseRequested)
            .expect("machine is live");
        self.graph.update().expect("update should succeed");
    }

    fn push_change(&mut self) {
        self.graph
            .send_trigger(VendingTrigger::ChangeRequested)
            .expect("machine is live");
        self.graph.update().expect("update should succeed");
    }

    fn state(&self) -> &'static str {
        self.graph.current_state_name()
    }

    fn read<R>(&self, f: impl FnOnce(&Vending) -> R) -> R {
        self.graph.blackboard().read(f)
    }
}

#[test]
fn test_starts_locked() {
    let vm = VendingHarness::new();
    assert_eq!(vm.state(), "Locked");
    assert!(vm.graph.is_current::<Locked>());
}

#[test]
fn test_coins_below_price_wait_for_more() {
    let mut vm = VendingHarness::new();

    vm.insert(1);
    assert_eq!(vm.state(), "NotEnoughMoney");

    vm.insert(2);
    assert_eq!(vm.state(), "EnoughMoney");
}

#[test]
fn test_enough_coins_at_once_skip_waiting() {
    let mut vm = VendingHarness::new();
    vm.insert(5);

    assert_eq!(vm.state(), "EnoughMoney");
    vm.read(|v| assert_eq!(v.visited, vec!["Locked", "NotEnoughMoney", "EnoughMoney"]));
}

#[test]
fn test_change_button_returns_everything() {
    let mut vm = VendingHarness::new();

    vm.push_change();
    assert_eq!(vm.read(|v| v.coins_returned), 0);

    vm.insert(2);
    vm.push_change();
    assert_eq!(vm.state(), "Locked");
    vm.read(|v| {
        assert_eq!(v.coins, 0);
        assert_eq!(v.coins_returned, 2);
    });

    vm.insert(3);
    vm.push_change();
    assert_eq!(vm.state(), "Locked");
    assert_eq!(vm.read(|v| v.coins_returned), 5);
}

/// Full purchase: one `on_enter` per distinct state visited, in order.
#[test]
fn test_dispense_returns_change_and_locks() {
    let mut vm = VendingHarness::new();

    vm.insert(4);
    vm.push_juice();

    assert_eq!(vm.state(), "Locked");
    vm.read(|v| {
        assert_eq!(v.juices_dispensed, 1);
        assert_eq!(v.coins_returned, 1);
        assert_eq!(
            v.visited,
            vec![
                "Locked",
                "NotEnoughMoney",
                "EnoughMoney",
                "Dispensing",
                "ReturningChange",
                "Locked"
            ]
        );
    });
}

#[test]
fn test_dispense_keeps_selling_while_money_lasts() {
    let mut vm = VendingHarness::new();

    vm.insert(7);
    vm.push_juice();
    assert_eq!(vm.state(), "EnoughMoney");

    vm.push_juice();
    assert_eq!(vm.state(), "Locked");
    vm.read(|v| {
        assert_eq!(v.juices_dispensed, 2);
        assert_eq!(v.coins_returned, 1);
    });
}
