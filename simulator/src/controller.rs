//! Simulation controller.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use multisig_common::{Address, Amount, MultisigError, TxIndex};
use multisig_engine::{
    AuthorizationEngine, CallHandler, MetricsSnapshot, WalletConfig, WalletSnapshot,
};

use crate::accounts::{AccountBehavior, AccountBook, SimulatedAccount};
use crate::scenario::{Action, Scenario, ScenarioStep};

/// Outcome of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Scenario name, or `random` for a seeded run.
    pub name: String,
    /// Steps performed.
    pub steps: usize,
    /// Steps that did not behave as expected.
    pub failures: Vec<String>,
    pub metrics: MetricsSnapshot,
    pub wallet: WalletSnapshot,
    pub accounts: Vec<SimulatedAccount>,
}

impl SimulationReport {
    /// Whether every step behaved as expected.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives a wallet through scripted or random activity.
pub struct SimulationController {
    /// Destination accounts; also the wallet's call handler.
    book: Arc<AccountBook>,
    /// Wallet under test.
    wallet: AuthorizationEngine,
    /// Owner labels in committee order.
    owner_labels: Vec<String>,
    /// Sum of accepted deposits.
    deposited: Amount,
    /// Steps performed.
    steps: usize,
    /// Mismatches found so far.
    failures: Vec<String>,
}

impl SimulationController {
    /// Create a controller with a fresh wallet owned by `owner_labels`.
    pub fn new(owner_labels: Vec<String>, threshold: usize) -> anyhow::Result<Self> {
        let book = Arc::new(AccountBook::new());
        let owners: Vec<Address> = owner_labels
            .iter()
            .map(|label| book.register(label, AccountBehavior::Accept))
            .collect();

        let handler: Arc<dyn CallHandler> = book.clone();
        let wallet = AuthorizationEngine::with_call_handler(
            WalletConfig::new(owners, threshold),
            handler,
        )?;

        info!(
            owners = owner_labels.len(),
            threshold,
            "Simulation wallet created"
        );

        Ok(Self {
            book,
            wallet,
            owner_labels,
            deposited: Amount::ZERO,
            steps: 0,
            failures: Vec::new(),
        })
    }

    /// Create a controller for a scenario and register its accounts.
    pub fn for_scenario(scenario: &Scenario) -> anyhow::Result<Self> {
        let controller = Self::new(scenario.owners.clone(), scenario.threshold)?;
        for account in &scenario.accounts {
            controller.book.register(&account.label, account.behavior);
        }
        Ok(controller)
    }

    /// Run every step of a scenario.
    pub fn run_scenario(&mut self, scenario: &Scenario) -> SimulationReport {
        info!(
            scenario = %scenario.name,
            steps = scenario.steps.len(),
            "Running scenario: {}",
            scenario.description
        );

        for (position, step) in scenario.steps.iter().enumerate() {
            if let Err(reason) = self.execute_step(step) {
                warn!(step = position, %reason, "Scenario step failed");
                self.failures.push(format!("step {}: {}", position, reason));
            }
            self.check_invariants();
        }

        self.report(&scenario.name)
    }

    /// Run `steps` random actions from a seeded generator, checking wallet
    /// invariants after each one.
    pub fn run_random(&mut self, steps: usize, seed: u64) -> SimulationReport {
        info!(steps, seed, "Running randomized simulation");

        let mut rng = StdRng::seed_from_u64(seed);
        let payees = [
            ("payee-accept", AccountBehavior::Accept),
            ("payee-revert", AccountBehavior::Revert),
            ("payee-reenter", AccountBehavior::Reenter),
        ];
        for (label, behavior) in payees {
            self.book.register(label, behavior);
        }

        for _ in 0..steps {
            let action = self.random_action(&mut rng, &payees);
            debug!(?action, "Random action");
            self.perform(&action);
        }

        self.report("random")
    }

    fn random_action(&self, rng: &mut StdRng, payees: &[(&str, AccountBehavior)]) -> Action {
        let caller = if rng.gen_bool(0.1) {
            "stranger".to_string()
        } else {
            self.owner_labels[rng.gen_range(0..self.owner_labels.len())].clone()
        };
        // One past the end so unknown indices get exercised too.
        let index = rng.gen_range(0..=self.wallet.transaction_count() as u64);

        match rng.gen_range(0..10) {
            0 | 1 => Action::Deposit {
                from: caller,
                amount: rng.gen_range(0..100),
            },
            2 | 3 => Action::Submit {
                caller,
                target: payees[rng.gen_range(0..payees.len())].0.to_string(),
                value: rng.gen_range(0..80),
                payload: Vec::new(),
            },
            4..=6 => Action::Confirm { caller, index },
            7 => Action::Revoke { caller, index },
            _ => Action::Execute { caller, index },
        }
    }

    /// Apply an action whose wallet outcome does not matter, recording
    /// failed assertions and invariant violations.
    fn perform(&mut self, action: &Action) {
        if let Err(reason) = self.apply(action) {
            warn!(step = self.steps, %reason, "Assertion failed");
            self.failures.push(format!("step {}: {}", self.steps, reason));
        }
        self.check_invariants();
    }

    /// Execute a single scenario step and compare against its expectation.
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<(), String> {
        let outcome = self.apply(&step.action)?;

        match (outcome, step.expect.as_deref()) {
            (Ok(()), None) => Ok(()),
            (Err(e), Some(code)) if e.error_code() == code => {
                debug!(code, "Step failed as expected");
                Ok(())
            }
            (Ok(()), Some(code)) => Err(format!("{:?} succeeded, expected {}", step.action, code)),
            (Err(e), _) => Err(format!("{:?} failed: {} ({})", step.action, e, e.error_code())),
        }
    }

    /// Apply an action. The outer error reports a failed assertion; the inner
    /// result is the wallet's answer.
    fn apply(&mut self, action: &Action) -> Result<Result<(), MultisigError>, String> {
        self.steps += 1;
        let book = &self.book;

        let outcome = match action {
            Action::Deposit { from, amount } => {
                let amount = Amount::from(*amount);
                let result = self.wallet.deposit(book.address(from), amount).map(|_| ());
                if result.is_ok() {
                    self.deposited = self.deposited.checked_add(amount).unwrap_or(self.deposited);
                }
                result
            }
            Action::Submit {
                caller,
                target,
                value,
                payload,
            } => self
                .wallet
                .submit(
                    book.address(caller),
                    book.address(target),
                    Amount::from(*value),
                    payload.clone(),
                )
                .map(|_| ()),
            Action::Confirm { caller, index } => self
                .wallet
                .confirm(book.address(caller), TxIndex::new(*index))
                .map(|_| ()),
            Action::Revoke { caller, index } => self
                .wallet
                .revoke(book.address(caller), TxIndex::new(*index))
                .map(|_| ()),
            Action::Execute { caller, index } => self
                .wallet
                .execute(book.address(caller), TxIndex::new(*index)),
            Action::AssertBalance { amount } => {
                let balance = self.wallet.balance();
                return expect_eq("balance", balance, Amount::from(*amount)).map(Ok);
            }
            Action::AssertConfirmations { index, count } => {
                let view = self
                    .wallet
                    .transaction(TxIndex::new(*index))
                    .map_err(|e| e.to_string())?;
                return expect_eq("confirmations", view.confirmation_count, *count).map(Ok);
            }
            Action::AssertExecuted { index, executed } => {
                let view = self
                    .wallet
                    .transaction(TxIndex::new(*index))
                    .map_err(|e| e.to_string())?;
                return expect_eq("executed", view.executed, *executed).map(Ok);
            }
            Action::AssertReceived { account, amount } => {
                let received = book
                    .get(account)
                    .map(|a| a.received)
                    .unwrap_or(Amount::ZERO);
                return expect_eq("received", received, Amount::from(*amount)).map(Ok);
            }
        };

        Ok(outcome)
    }

    /// Check wallet-wide invariants, recording any violation.
    fn check_invariants(&mut self) {
        let mut violations = Vec::new();
        let treasury = self.wallet.treasury();

        if !treasury.is_consistent() {
            violations.push("treasury totals disagree with balance".to_string());
        }

        let paid_out = self.book.total_received();
        if self.wallet.balance().checked_add(paid_out) != Some(self.deposited) {
            violations.push(format!(
                "value not conserved: balance {} + paid {} != deposited {}",
                self.wallet.balance(),
                paid_out,
                self.deposited
            ));
        }

        let threshold = self.wallet.threshold();
        let owners = self.wallet.owners().len();
        let mut executed = 0u64;
        for position in 0..self.wallet.transaction_count() {
            let Ok(view) = self.wallet.transaction(TxIndex::new(position as u64)) else {
                violations.push(format!("record {} missing", position));
                continue;
            };
            if view.confirmation_count > owners {
                violations.push(format!("record {} has too many confirmations", position));
            }
            if view.executed {
                executed += 1;
                if view.confirmation_count < threshold {
                    violations.push(format!("record {} executed below threshold", position));
                }
            }
        }

        if self.wallet.metrics().snapshot().executions_succeeded != executed {
            violations.push("execution counter disagrees with ledger".to_string());
        }

        for violation in violations {
            warn!(step = self.steps, %violation, "Invariant violated");
            self.failures
                .push(format!("after step {}: {}", self.steps, violation));
        }
    }

    /// Build the final report.
    pub fn report(&self, name: &str) -> SimulationReport {
        SimulationReport {
            name: name.to_string(),
            steps: self.steps,
            failures: self.failures.clone(),
            metrics: self.wallet.metrics().snapshot(),
            wallet: self.wallet.snapshot(),
            accounts: self.book.accounts(),
        }
    }
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(what: &str, actual: T, expected: T) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("{}: expected {:?}, got {:?}", what, expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_scenarios_pass() {
        for name in Scenario::BUILT_IN {
            let scenario = Scenario::load(name).unwrap();
            let mut controller = SimulationController::for_scenario(&scenario).unwrap();
            let report = controller.run_scenario(&scenario);
            assert!(report.passed(), "{}: {:?}", name, report.failures);
        }
    }

    #[test]
    fn test_reentrant_payee_paid_once() {
        let scenario = Scenario::load("reentrancy").unwrap();
        let mut controller = SimulationController::for_scenario(&scenario).unwrap();
        let report = controller.run_scenario(&scenario);

        let attacker = report
            .accounts
            .iter()
            .find(|a| a.label == "attacker")
            .unwrap();
        assert_eq!(attacker.calls, 1);
        assert_eq!(report.metrics.executions_succeeded, 1);
    }

    #[test]
    fn test_wrong_expectation_is_reported() {
        let mut scenario = Scenario::load("quorum").unwrap();
        scenario.steps[0].expect = Some("UNAUTHORIZED".to_string());

        let mut controller = SimulationController::for_scenario(&scenario).unwrap();
        let report = controller.run_scenario(&scenario);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].starts_with("step 0"));
    }

    #[test]
    fn test_random_run_keeps_invariants() {
        let owners = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        for seed in 0..8 {
            let mut controller = SimulationController::new(owners.clone(), 2).unwrap();
            let report = controller.run_random(300, seed);
            assert!(report.passed(), "seed {}: {:?}", seed, report.failures);
            assert_eq!(report.steps, 300);
        }
    }

    #[test]
    fn test_unscripted_assertion_failure_is_recorded() {
        let mut controller = SimulationController::new(vec!["a".to_string()], 1).unwrap();

        controller.perform(&Action::Deposit {
            from: "a".to_string(),
            amount: 5,
        });
        controller.perform(&Action::AssertBalance { amount: 5 });
        assert!(controller.report("manual").passed());

        controller.perform(&Action::AssertBalance { amount: 6 });
        let report = controller.report("manual");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].starts_with("step 3: balance"));
    }

    #[test]
    fn test_invalid_committee_rejected() {
        assert!(SimulationController::new(Vec::new(), 1).is_err());
        assert!(SimulationController::new(vec!["a".to_string()], 2).is_err());
        assert!(SimulationController::new(vec!["a".to_string(), "a".to_string()], 1).is_err());
    }
}
