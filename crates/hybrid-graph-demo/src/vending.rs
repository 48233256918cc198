//! The vending agent: a coin-collecting leaf state and a dispensing tree.
use std::collections::VecDeque;
use std::time::Duration;

use hybrid_graph::behaviour::{If, TimeLimit};
use hybrid_graph::{
    AbortResult, BehaviourTree, Leaf, LeafState, Result, RootNode, StateBuilder, StateContext,
    StateMachine, Tree, TreeEnd, Trigger, action, sequence, wait,
};
use tracing::{info, warn};

const MOTOR_RUN: Duration = Duration::from_millis(200);
const DISPENSE_TIMEOUT: Duration = Duration::from_secs(1);

#[repr(i32)]
#[derive(Debug, Clone, Copy)]
pub enum VendingTrigger {
    Paid = 1,
    Dispensed,
    Fault,
}

impl From<VendingTrigger> for Trigger {
    fn from(trigger: VendingTrigger) -> Self {
        Trigger(trigger as i32)
    }
}

#[derive(Debug)]
pub struct VendingBoard {
    price: u32,
    stock: u32,
    credit: u32,
    sold: u32,
    refunded: u32,
    coins: VecDeque<u32>,
}

impl VendingBoard {
    pub fn new(price: u32, stock: u32, coins: Vec<u32>) -> Self {
        Self {
            price,
            stock,
            credit: 0,
            sold: 0,
            refunded: 0,
            coins: coins.into(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "sold {}, {} left in stock, refunded {}, {} coins unused",
            self.sold,
            self.stock,
            self.refunded,
            self.coins.len()
        )
    }
}

/// Takes one coin per update until the price is covered.
#[derive(Default)]
pub struct Waiting;

impl LeafState<VendingBoard> for Waiting {
    fn on_update(&self, ctx: &mut StateContext<'_, VendingBoard>) {
        let Some(coin) = ctx.coins.pop_front() else {
            return;
        };
        ctx.credit += coin;
        info!(coin, credit = ctx.credit, "coin inserted");

        if ctx.credit >= ctx.price {
            ctx.send_trigger(VendingTrigger::Paid);
        }
    }
}

#[derive(Default)]
pub struct OutOfOrder;

impl LeafState<VendingBoard> for OutOfOrder {
    fn on_enter(&self, ctx: &mut StateContext<'_, VendingBoard>) {
        let credit = std::mem::take(&mut ctx.credit);
        warn!(credit, "out of order, refunding credit");
        ctx.refunded += credit;
    }
}

/// Checks stock, runs the motor and releases one item.
#[derive(Default)]
pub struct Dispense;

impl BehaviourTree<VendingBoard> for Dispense {
    fn setup_behaviours(&self, root: &mut RootNode<VendingBoard>) -> Result<()> {
        root.add(
            sequence(vec![
                action(|b: &mut VendingBoard| b.stock > 0).named("CheckStock"),
                wait(MOTOR_RUN).named("RunMotor"),
                action(|b: &mut VendingBoard| {
                    b.stock -= 1;
                    b.credit -= b.price;
                    b.sold += 1;
                    true
                })
                .named("Release")
                .with(If::new(|b: &VendingBoard| b.credit >= b.price)),
            ])
            .with(TimeLimit::new(DISPENSE_TIMEOUT, AbortResult::Failed)),
        )
    }

    fn on_enter_as_leaf_state(&self, board: &mut VendingBoard) {
        info!(stock = board.stock, "dispensing");
    }

    fn on_end_execute(&self, board: &mut VendingBoard, end: &TreeEnd<'_>) {
        if end.result().is_succeeded() {
            info!(sold = board.sold, credit = board.credit, "item dispensed");
            end.post_trigger(VendingTrigger::Dispensed);
        } else {
            end.post_trigger(VendingTrigger::Fault);
        }
    }
}

#[derive(Default)]
pub struct Vendor;

impl StateMachine<VendingBoard> for Vendor {
    fn setup_states(&self, states: &mut StateBuilder<'_, VendingBoard>) -> Result<()> {
        states
            .set_initial_state::<Leaf<Waiting>>()?
            .add_transition::<Leaf<Waiting>, Tree<Dispense>>(VendingTrigger::Paid)?
            .add_transition::<Tree<Dispense>, Leaf<Waiting>>(VendingTrigger::Dispensed)?
            .add_transition::<Tree<Dispense>, Leaf<OutOfOrder>>(VendingTrigger::Fault)?;
        Ok(())
    }
}
