//! Simulation scenarios.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::accounts::AccountBehavior;

/// A scripted run against a fresh wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Owner labels, in committee order.
    pub owners: Vec<String>,
    /// Confirmations required.
    pub threshold: usize,
    /// Non-owner accounts.
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A non-owner account taking part in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSpec {
    pub label: String,
    #[serde(default)]
    pub behavior: AccountBehavior,
}

/// One action and the outcome it must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// What to do.
    pub action: Action,
    /// Expected error code; `None` means the action must succeed.
    #[serde(default)]
    pub expect: Option<String>,
}

/// Wallet calls and checks a scenario can perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Deposit {
        from: String,
        amount: u64,
    },
    Submit {
        caller: String,
        target: String,
        value: u64,
        #[serde(default)]
        payload: Vec<u8>,
    },
    Confirm {
        caller: String,
        index: u64,
    },
    Revoke {
        caller: String,
        index: u64,
    },
    Execute {
        caller: String,
        index: u64,
    },
    /// Wallet balance equals.
    AssertBalance { amount: u64 },
    /// Confirmation count of a record equals.
    AssertConfirmations { index: u64, count: usize },
    /// Execution flag of a record equals.
    AssertExecuted { index: u64, executed: bool },
    /// Value received by an account equals.
    AssertReceived { account: String, amount: u64 },
}

impl ScenarioStep {
    fn ok(action: Action) -> Self {
        Self {
            action,
            expect: None,
        }
    }

    fn fails(action: Action, code: &str) -> Self {
        Self {
            action,
            expect: Some(code.to_string()),
        }
    }
}

fn deposit(from: &str, amount: u64) -> Action {
    Action::Deposit {
        from: from.to_string(),
        amount,
    }
}

fn submit(caller: &str, target: &str, value: u64) -> Action {
    Action::Submit {
        caller: caller.to_string(),
        target: target.to_string(),
        value,
        payload: Vec::new(),
    }
}

fn confirm(caller: &str, index: u64) -> Action {
    Action::Confirm {
        caller: caller.to_string(),
        index,
    }
}

fn revoke(caller: &str, index: u64) -> Action {
    Action::Revoke {
        caller: caller.to_string(),
        index,
    }
}

fn execute(caller: &str, index: u64) -> Action {
    Action::Execute {
        caller: caller.to_string(),
        index,
    }
}

impl Scenario {
    /// Names of the built-in scenarios.
    pub const BUILT_IN: [&'static str; 5] =
        ["quorum", "unauthorized", "revoke", "reentrancy", "failed-call"];

    /// Load a built-in scenario by name, or a JSON scenario file by path.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "quorum" => Ok(Self::quorum()),
            "unauthorized" => Ok(Self::unauthorized()),
            "revoke" => Ok(Self::revoke()),
            "reentrancy" => Ok(Self::reentrancy()),
            "failed-call" => Ok(Self::failed_call()),
            path if path.ends_with(".json") => Self::from_file(Path::new(path)),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Read a scenario from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn owners(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    /// Three-of-three approval of a zero-value call.
    fn quorum() -> Self {
        Self {
            name: "quorum".to_string(),
            description: "3-of-3 committee confirms and executes a call".to_string(),
            owners: Self::owners(&["owner", "account1", "account2"]),
            threshold: 3,
            accounts: Vec::new(),
            steps: vec![
                ScenarioStep::ok(deposit("owner", 1)),
                ScenarioStep::ok(Action::AssertBalance { amount: 1 }),
                ScenarioStep::ok(submit("owner", "account1", 0)),
                ScenarioStep::ok(Action::AssertConfirmations { index: 0, count: 0 }),
                ScenarioStep::ok(confirm("account1", 0)),
                ScenarioStep::ok(Action::AssertConfirmations { index: 0, count: 1 }),
                ScenarioStep::ok(Action::AssertExecuted {
                    index: 0,
                    executed: false,
                }),
                ScenarioStep::fails(confirm("account1", 0), "ALREADY_CONFIRMED"),
                ScenarioStep::fails(execute("owner", 0), "INSUFFICIENT_CONFIRMATIONS"),
                ScenarioStep::ok(confirm("owner", 0)),
                ScenarioStep::ok(confirm("account2", 0)),
                ScenarioStep::ok(Action::AssertConfirmations { index: 0, count: 3 }),
                ScenarioStep::ok(execute("account2", 0)),
                ScenarioStep::ok(Action::AssertExecuted {
                    index: 0,
                    executed: true,
                }),
                ScenarioStep::fails(execute("owner", 0), "ALREADY_EXECUTED"),
                ScenarioStep::fails(confirm("owner", 7), "NOT_FOUND"),
            ],
        }
    }

    /// Non-members cannot act.
    fn unauthorized() -> Self {
        Self {
            name: "unauthorized".to_string(),
            description: "2-of-2 committee refuses a non-member".to_string(),
            owners: Self::owners(&["alice", "bob"]),
            threshold: 2,
            accounts: vec![AccountSpec {
                label: "mallory".to_string(),
                behavior: AccountBehavior::Accept,
            }],
            steps: vec![
                ScenarioStep::ok(deposit("mallory", 10)),
                ScenarioStep::fails(submit("mallory", "mallory", 10), "UNAUTHORIZED"),
                ScenarioStep::ok(submit("alice", "mallory", 10)),
                ScenarioStep::fails(confirm("mallory", 0), "UNAUTHORIZED"),
                ScenarioStep::ok(confirm("alice", 0)),
                ScenarioStep::fails(execute("mallory", 0), "UNAUTHORIZED"),
                ScenarioStep::fails(execute("alice", 0), "INSUFFICIENT_CONFIRMATIONS"),
                ScenarioStep::ok(Action::AssertBalance { amount: 10 }),
            ],
        }
    }

    /// Revocation drops a ready record back below quorum.
    fn revoke() -> Self {
        Self {
            name: "revoke".to_string(),
            description: "Confirmations are withdrawn and re-granted".to_string(),
            owners: Self::owners(&["alice", "bob", "carol"]),
            threshold: 2,
            accounts: vec![AccountSpec {
                label: "vendor".to_string(),
                behavior: AccountBehavior::Accept,
            }],
            steps: vec![
                ScenarioStep::ok(deposit("alice", 100)),
                ScenarioStep::ok(submit("bob", "vendor", 60)),
                ScenarioStep::fails(revoke("alice", 0), "NOT_CONFIRMED"),
                ScenarioStep::ok(confirm("alice", 0)),
                ScenarioStep::ok(confirm("bob", 0)),
                ScenarioStep::ok(revoke("alice", 0)),
                ScenarioStep::ok(Action::AssertConfirmations { index: 0, count: 1 }),
                ScenarioStep::fails(execute("bob", 0), "INSUFFICIENT_CONFIRMATIONS"),
                ScenarioStep::ok(confirm("carol", 0)),
                ScenarioStep::ok(execute("bob", 0)),
                ScenarioStep::fails(revoke("carol", 0), "ALREADY_EXECUTED"),
                ScenarioStep::ok(Action::AssertBalance { amount: 40 }),
                ScenarioStep::ok(Action::AssertReceived {
                    account: "vendor".to_string(),
                    amount: 60,
                }),
            ],
        }
    }

    /// A destination that calls back into the wallet gets paid once.
    fn reentrancy() -> Self {
        Self {
            name: "reentrancy".to_string(),
            description: "Re-entrant execution from the destination is refused".to_string(),
            owners: Self::owners(&["alice", "bob"]),
            threshold: 2,
            accounts: vec![AccountSpec {
                label: "attacker".to_string(),
                behavior: AccountBehavior::Reenter,
            }],
            steps: vec![
                ScenarioStep::ok(deposit("alice", 50)),
                ScenarioStep::ok(submit("alice", "attacker", 20)),
                ScenarioStep::ok(confirm("alice", 0)),
                ScenarioStep::ok(confirm("bob", 0)),
                ScenarioStep::ok(execute("bob", 0)),
                ScenarioStep::ok(Action::AssertBalance { amount: 30 }),
                ScenarioStep::ok(Action::AssertReceived {
                    account: "attacker".to_string(),
                    amount: 20,
                }),
            ],
        }
    }

    /// A reverting destination leaves the record executable.
    fn failed_call() -> Self {
        Self {
            name: "failed-call".to_string(),
            description: "A rejected call rolls the execution back".to_string(),
            owners: Self::owners(&["alice", "bob"]),
            threshold: 1,
            accounts: vec![
                AccountSpec {
                    label: "vault".to_string(),
                    behavior: AccountBehavior::Revert,
                },
                AccountSpec {
                    label: "vendor".to_string(),
                    behavior: AccountBehavior::Accept,
                },
            ],
            steps: vec![
                ScenarioStep::ok(deposit("bob", 10)),
                ScenarioStep::ok(submit("alice", "vault", 10)),
                ScenarioStep::ok(confirm("bob", 0)),
                ScenarioStep::fails(execute("alice", 0), "EXECUTION_FAILED"),
                ScenarioStep::ok(Action::AssertExecuted {
                    index: 0,
                    executed: false,
                }),
                ScenarioStep::ok(Action::AssertBalance { amount: 10 }),
                ScenarioStep::ok(submit("alice", "vendor", 11)),
                ScenarioStep::ok(confirm("alice", 1)),
                ScenarioStep::fails(execute("alice", 1), "EXECUTION_FAILED"),
                ScenarioStep::ok(deposit("bob", 1)),
                ScenarioStep::ok(execute("alice", 1)),
                ScenarioStep::ok(Action::AssertBalance { amount: 0 }),
            ],
        }
    }
}
