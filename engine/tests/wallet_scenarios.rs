//! End-to-end wallet behavior, including calls that re-enter the engine.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use multisig_common::{Address, Amount, MultisigError, TxIndex, WalletEvent};
use multisig_engine::{
    AuthorizationEngine, CallHandler, CallRejection, OutboundCall, TransactionStatus, WalletConfig,
};

fn addr(label: &str) -> Address {
    Address::derive(label)
}

/// Tries to execute the same record again from inside the outbound call.
struct ReentrantExecutor {
    owner: Address,
    observed: Mutex<Vec<MultisigError>>,
}

impl CallHandler for ReentrantExecutor {
    fn handle_call(
        &self,
        wallet: &mut AuthorizationEngine,
        call: &OutboundCall,
    ) -> Result<(), CallRejection> {
        assert!(wallet.transaction(call.index).unwrap().executed);
        if let Err(e) = wallet.execute(self.owner, call.index) {
            self.observed.lock().unwrap().push(e);
        }
        Ok(())
    }
}

/// Touches wallet state, then refuses the call.
struct MeddlingRejector {
    owner: Address,
    other: TxIndex,
}

impl CallHandler for MeddlingRejector {
    fn handle_call(
        &self,
        wallet: &mut AuthorizationEngine,
        call: &OutboundCall,
    ) -> Result<(), CallRejection> {
        wallet.deposit(call.target, Amount::new(1_000))?;
        wallet.confirm(self.owner, self.other)?;
        Err(CallRejection::Rejected {
            target: call.target,
            reason: "destination reverted".to_string(),
        })
    }
}

/// Propagates the failure of a nested execution.
struct NestedExecutor {
    owner: Address,
    nested: TxIndex,
}

impl CallHandler for NestedExecutor {
    fn handle_call(
        &self,
        wallet: &mut AuthorizationEngine,
        call: &OutboundCall,
    ) -> Result<(), CallRejection> {
        if call.index != self.nested {
            wallet.execute(self.owner, self.nested)?;
        }
        Ok(())
    }
}

fn confirm_all(wallet: &mut AuthorizationEngine, owners: &[Address], index: TxIndex) {
    for owner in owners {
        wallet.confirm(*owner, index).unwrap();
    }
}

#[test]
fn test_two_of_two_rejects_non_member() {
    let (a, b, x) = (addr("a"), addr("b"), addr("x"));
    let mut wallet = AuthorizationEngine::new(WalletConfig::new(vec![a, b], 2)).unwrap();

    assert_eq!(
        wallet.submit(x, a, Amount::ZERO, vec![]).unwrap_err(),
        MultisigError::Unauthorized(x)
    );
    assert!(!wallet.is_owner(&x));
    assert_eq!(wallet.transaction_count(), 0);
}

#[test]
fn test_reentrant_execute_observes_executed_flag() {
    let owners = vec![addr("a"), addr("b"), addr("c")];
    let handler = Arc::new(ReentrantExecutor {
        owner: owners[1],
        observed: Mutex::new(Vec::new()),
    });
    let mut wallet =
        AuthorizationEngine::with_call_handler(WalletConfig::new(owners.clone(), 2), handler.clone())
            .unwrap();

    wallet.deposit(addr("funder"), Amount::new(10)).unwrap();
    let index = wallet.submit(owners[0], addr("attacker"), Amount::new(10), vec![0xab]).unwrap();
    confirm_all(&mut wallet, &owners[..2], index);

    wallet.execute(owners[0], index).unwrap();

    assert_eq!(
        *handler.observed.lock().unwrap(),
        vec![MultisigError::AlreadyExecuted(index)]
    );
    assert_eq!(wallet.balance(), Amount::ZERO);
    assert_eq!(wallet.treasury().total_released(), Amount::new(10));

    let executions = wallet
        .events()
        .iter()
        .filter(|r| matches!(r.event, WalletEvent::ExecuteTransaction { .. }))
        .count();
    assert_eq!(executions, 1);
}

#[test]
fn test_rejected_call_rolls_back_everything() {
    let owners = vec![addr("a"), addr("b")];
    let mut wallet = AuthorizationEngine::with_call_handler(
        WalletConfig::new(owners.clone(), 2),
        Arc::new(MeddlingRejector {
            owner: owners[0],
            other: TxIndex::new(1),
        }),
    )
    .unwrap();

    wallet.deposit(owners[0], Amount::new(50)).unwrap();
    let index = wallet.submit(owners[0], addr("payee"), Amount::new(20), vec![]).unwrap();
    let other = wallet.submit(owners[1], addr("payee"), Amount::new(1), vec![]).unwrap();
    confirm_all(&mut wallet, &owners, index);

    let before = wallet.snapshot();
    let events_before = wallet.events().len();

    let err = wallet.execute(owners[1], index).unwrap_err();
    match err {
        MultisigError::ExecutionFailed { index: failed, reason } => {
            assert_eq!(failed, index);
            assert!(reason.contains("destination reverted"));
        }
        unexpected => panic!("unexpected error: {unexpected:?}"),
    }

    assert_eq!(wallet.snapshot(), before);
    assert_eq!(wallet.events().len(), events_before);
    assert_eq!(wallet.balance(), Amount::new(50));
    assert!(!wallet.is_confirmed(other, &owners[0]).unwrap());
    assert_eq!(wallet.status(index).unwrap(), TransactionStatus::Ready);
}

#[test]
fn test_nested_failure_propagates_and_rolls_back() {
    let owners = vec![addr("a"), addr("b")];
    let mut wallet = AuthorizationEngine::with_call_handler(
        WalletConfig::new(owners.clone(), 1),
        Arc::new(NestedExecutor {
            owner: owners[0],
            nested: TxIndex::new(1),
        }),
    )
    .unwrap();

    wallet.deposit(owners[0], Amount::new(5)).unwrap();
    let outer = wallet.submit(owners[0], addr("payee"), Amount::new(5), vec![]).unwrap();
    let nested = wallet.submit(owners[0], addr("payee"), Amount::new(1), vec![]).unwrap();
    wallet.confirm(owners[1], outer).unwrap();
    wallet.confirm(owners[1], nested).unwrap();

    // The outer call drains the treasury, so the nested one cannot pay out.
    let err = wallet.execute(owners[0], outer).unwrap_err();
    assert_eq!(err.error_code(), "EXECUTION_FAILED");
    assert!(!wallet.transaction(outer).unwrap().executed);
    assert!(!wallet.transaction(nested).unwrap().executed);
    assert_eq!(wallet.balance(), Amount::new(5));

    // Funded, both records execute: the nested one from inside the outer call.
    wallet.deposit(owners[1], Amount::new(1)).unwrap();
    wallet.execute(owners[0], outer).unwrap();
    assert!(wallet.transaction(nested).unwrap().executed);
    assert_eq!(wallet.balance(), Amount::ZERO);
    assert_eq!(wallet.metrics().snapshot().executions_succeeded, 2);
}

#[test]
fn test_event_stream_for_full_lifecycle() {
    let owners = vec![addr("a"), addr("b")];
    let mut wallet = AuthorizationEngine::new(WalletConfig::new(owners.clone(), 2)).unwrap();

    wallet.deposit(addr("funder"), Amount::new(3)).unwrap();
    let index = wallet.submit(owners[0], addr("payee"), Amount::new(3), vec![7]).unwrap();
    wallet.confirm(owners[0], index).unwrap();
    wallet.revoke(owners[0], index).unwrap();
    confirm_all(&mut wallet, &owners, index);
    wallet.execute(owners[1], index).unwrap();

    let names: Vec<&str> = wallet.events().iter().map(|r| r.event.name()).collect();
    assert_eq!(
        names,
        vec![
            "Deposit",
            "SubmitTransaction",
            "ConfirmTransaction",
            "RevokeConfirmation",
            "ConfirmTransaction",
            "ConfirmTransaction",
            "ExecuteTransaction",
        ]
    );
    assert_eq!(
        wallet.events()[3].event,
        WalletEvent::RevokeConfirmation {
            index,
            caller: owners[0],
            new_count: 0,
        }
    );
    assert_eq!(wallet.events_since(6).len(), 1);

    let json = serde_json::to_string(&wallet.snapshot()).unwrap();
    assert!(json.contains("\"status\":\"EXECUTED\""));
}

// --- Model-based property test ---

const OWNERS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Deposit(u64),
    Submit(usize, u64),
    Confirm(usize, u64),
    Revoke(usize, u64),
    Execute(usize, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Caller index OWNERS is a non-member.
    prop_oneof![
        (0u64..40).prop_map(Op::Deposit),
        (0..=OWNERS, 0u64..30).prop_map(|(c, v)| Op::Submit(c, v)),
        (0..=OWNERS, 0u64..6).prop_map(|(c, i)| Op::Confirm(c, i)),
        (0..=OWNERS, 0u64..6).prop_map(|(c, i)| Op::Revoke(c, i)),
        (0..=OWNERS, 0u64..6).prop_map(|(c, i)| Op::Execute(c, i)),
    ]
}

#[derive(Default)]
struct Model {
    confirmed: Vec<BTreeSet<usize>>,
    executed: Vec<bool>,
    values: Vec<u64>,
    balance: u128,
}

impl Model {
    fn expected(&self, op: &Op, threshold: usize) -> Result<(), &'static str> {
        let (caller, index) = match op {
            Op::Deposit(_) => return Ok(()),
            Op::Submit(c, _) => {
                return if *c < OWNERS { Ok(()) } else { Err("UNAUTHORIZED") };
            }
            Op::Confirm(c, i) | Op::Revoke(c, i) | Op::Execute(c, i) => (*c, *i as usize),
        };

        if caller >= OWNERS {
            return Err("UNAUTHORIZED");
        }
        if index >= self.executed.len() {
            return Err("NOT_FOUND");
        }
        if self.executed[index] {
            return Err("ALREADY_EXECUTED");
        }

        match op {
            Op::Confirm(..) if self.confirmed[index].contains(&caller) => Err("ALREADY_CONFIRMED"),
            Op::Revoke(..) if !self.confirmed[index].contains(&caller) => Err("NOT_CONFIRMED"),
            Op::Execute(..) if self.confirmed[index].len() < threshold => {
                Err("INSUFFICIENT_CONFIRMATIONS")
            }
            Op::Execute(..) if self.values[index] as u128 > self.balance => Err("EXECUTION_FAILED"),
            _ => Ok(()),
        }
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Deposit(amount) => self.balance += *amount as u128,
            Op::Submit(_, value) => {
                self.confirmed.push(BTreeSet::new());
                self.executed.push(false);
                self.values.push(*value);
            }
            Op::Confirm(c, i) => {
                self.confirmed[*i as usize].insert(*c);
            }
            Op::Revoke(c, i) => {
                self.confirmed[*i as usize].remove(c);
            }
            Op::Execute(_, i) => {
                self.executed[*i as usize] = true;
                self.balance -= self.values[*i as usize] as u128;
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_engine_matches_model(
        threshold in 1..=OWNERS,
        ops in proptest::collection::vec(op_strategy(), 1..80),
    ) {
        let mut identities: Vec<Address> =
            (0..OWNERS).map(|i| addr(&format!("owner-{i}"))).collect();
        let owners = identities.clone();
        identities.push(addr("stranger"));

        let mut wallet = AuthorizationEngine::new(WalletConfig::new(owners.clone(), threshold)).unwrap();
        let mut model = Model::default();
        let payee = addr("payee");

        for op in &ops {
            let expected = model.expected(op, threshold);
            let actual = match op {
                Op::Deposit(amount) => wallet.deposit(payee, Amount::from(*amount)).map(|_| ()),
                Op::Submit(c, value) => wallet
                    .submit(identities[*c], payee, Amount::from(*value), vec![])
                    .map(|_| ()),
                Op::Confirm(c, i) => wallet.confirm(identities[*c], TxIndex::new(*i)).map(|_| ()),
                Op::Revoke(c, i) => wallet.revoke(identities[*c], TxIndex::new(*i)).map(|_| ()),
                Op::Execute(c, i) => wallet.execute(identities[*c], TxIndex::new(*i)),
            };

            prop_assert_eq!(actual.as_ref().map_err(|e| e.error_code()).copied(), expected, "op {:?}", op);
            if expected.is_ok() {
                model.apply(op);
            }

            prop_assert_eq!(wallet.balance().units(), model.balance);
            prop_assert!(wallet.treasury().is_consistent());
            prop_assert_eq!(wallet.transaction_count(), model.executed.len());

            for (i, confirmed) in model.confirmed.iter().enumerate() {
                let index = TxIndex::new(i as u64);
                let view = wallet.transaction(index).unwrap();
                prop_assert_eq!(view.confirmation_count, confirmed.len());
                prop_assert_eq!(view.executed, model.executed[i]);
                for (slot, owner) in owners.iter().enumerate() {
                    prop_assert_eq!(
                        wallet.is_confirmed(index, owner).unwrap(),
                        confirmed.contains(&slot)
                    );
                }
            }
        }
    }

    #[test]
    fn prop_distinct_confirmations_count(n in 1usize..10) {
        let owners: Vec<Address> = (0..n).map(|i| addr(&format!("member-{i}"))).collect();
        let mut wallet = AuthorizationEngine::new(WalletConfig::new(owners.clone(), n)).unwrap();
        let index = wallet.submit(owners[0], addr("payee"), Amount::ZERO, vec![]).unwrap();

        for (i, owner) in owners.iter().enumerate() {
            prop_assert_eq!(wallet.confirm(*owner, index).unwrap(), i + 1);
        }
        prop_assert_eq!(wallet.transaction(index).unwrap().confirmation_count, n);
        prop_assert!(wallet.execute(owners[n - 1], index).is_ok());
        prop_assert!(wallet.execute(owners[0], index).is_err());
    }
}
