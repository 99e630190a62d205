#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, U256};

use deedshare_wallet_adapters::{fuji_deployment, Eip1193Adapter, SimulatedWallet};
use deedshare_wallet_core::{ClientPolicy, ClockPort, WalletClient};

/// Deterministic clock shared between the test body and the client; `sleep`
/// advances it so confirmation polling terminates instantly.
#[derive(Clone, Default)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl TestClock {
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst) + 1_750_000_000_000
    }

    fn sleep_ms(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

pub type TestClient = WalletClient<Eip1193Adapter, TestClock>;

pub struct Harness {
    pub client: TestClient,
    pub sim: Arc<Mutex<SimulatedWallet>>,
    pub clock: TestClock,
}

pub fn harness() -> Harness {
    harness_with(SimulatedWallet::default())
}

pub fn harness_with(wallet: SimulatedWallet) -> Harness {
    let adapter = Eip1193Adapter::simulated(wallet);
    let sim = adapter.simulation().expect("simulated transport");
    let clock = TestClock::default();
    let client = WalletClient::new(
        adapter,
        clock.clone(),
        fuji_deployment(),
        ClientPolicy::default(),
    )
    .expect("client construction");
    Harness { client, sim, clock }
}

impl Harness {
    pub fn count_requests(&self, method: &str) -> usize {
        self.sim.lock().expect("sim lock").count_requests(method)
    }

    pub fn with_sim<R>(&self, f: impl FnOnce(&mut SimulatedWallet) -> R) -> R {
        let mut wallet = self.sim.lock().expect("sim lock");
        f(&mut wallet)
    }
}

pub fn default_account() -> Address {
    SimulatedWallet::default_account()
}

pub fn other_account() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid test account")
}

pub fn ether(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
}
