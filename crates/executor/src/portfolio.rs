use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scarlet_network::{token_programs, NetworkError, NetworkService};
use scarlet_types::{lamports_to_sol, Pubkey};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Default minimum interval between non-forced refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Wallet balance of one token, summed over its accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    pub mint: String,
    /// Human units
    pub amount: Decimal,
    pub decimals: u8,
    pub accounts: Vec<Pubkey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortfolioSnapshot {
    pub lamports: u64,
    /// Keyed by mint. Frozen accounts are left out.
    pub holdings: BTreeMap<String, Holding>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl PortfolioSnapshot {
    /// Native balance in SOL
    pub fn balance(&self) -> Decimal {
        lamports_to_sol(self.lamports)
    }

    pub fn holding(&self, mint: &str) -> Option<&Holding> {
        self.holdings.get(mint)
    }
}

/// Cached view of the wallet's balances
pub struct Portfolio {
    network: Arc<dyn NetworkService>,
    owner: Pubkey,
    min_interval: Duration,
    last_attempt: Mutex<Option<DateTime<Utc>>>,
    snapshot: RwLock<PortfolioSnapshot>,
}

impl Portfolio {
    pub fn new(network: Arc<dyn NetworkService>, owner: Pubkey, min_interval: Duration) -> Self {
        Self {
            network,
            owner,
            min_interval,
            last_attempt: Mutex::new(None),
            snapshot: RwLock::new(PortfolioSnapshot::default()),
        }
    }

    pub fn owner(&self) -> &Pubkey {
        &self.owner
    }

    pub async fn snapshot(&self) -> PortfolioSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Cached native balance in SOL; zero before the first refresh
    pub async fn balance(&self) -> Decimal {
        self.snapshot.read().await.balance()
    }

    /// Reload balances from the network.
    ///
    /// Without `force`, a call within the minimum interval of the previous
    /// attempt does nothing and returns `Ok(None)`. The interval counts from
    /// the attempt, so a failed refresh is throttled too.
    pub async fn refresh(&self, force: bool) -> Result<Option<PortfolioSnapshot>, NetworkError> {
        let now = Utc::now();
        if !self.claim_attempt(now, force) {
            debug!(owner = %self.owner, "skipping throttled portfolio refresh");
            return Ok(None);
        }

        let lamports = self.network.get_balance(&self.owner).await?;
        let mut holdings: BTreeMap<String, Holding> = BTreeMap::new();
        for program in token_programs() {
            let accounts = self.network.get_token_accounts(&self.owner, &program).await?;
            for account in accounts.into_iter().filter(|a| !a.frozen) {
                let holding = holdings
                    .entry(account.mint.clone())
                    .or_insert_with(|| Holding {
                        mint: account.mint.clone(),
                        amount: Decimal::ZERO,
                        decimals: account.decimals,
                        accounts: Vec::new(),
                    });
                holding.amount += account.ui_amount();
                holding.accounts.push(account.address);
            }
        }

        let snapshot = PortfolioSnapshot {
            lamports,
            holdings,
            refreshed_at: Some(now),
        };
        *self.snapshot.write().await = snapshot.clone();

        debug!(
            owner = %self.owner,
            lamports,
            holdings = snapshot.holdings.len(),
            "portfolio refreshed"
        );
        Ok(Some(snapshot))
    }

    fn claim_attempt(&self, now: DateTime<Utc>, force: bool) -> bool {
        let Ok(mut last) = self.last_attempt.lock() else {
            return true;
        };

        let throttled = match *last {
            Some(previous) if !force => match (now - previous).to_std() {
                Ok(elapsed) => elapsed < self.min_interval,
                // clock moved backwards
                Err(_) => true,
            },
            _ => false,
        };

        if !throttled {
            *last = Some(now);
        }
        !throttled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarlet_network::{MockNetwork, TokenAccount};
    use scarlet_types::{TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID};
    use std::str::FromStr;

    fn account(byte: u8, mint: &str, program: &Pubkey, amount: u64, frozen: bool) -> TokenAccount {
        TokenAccount {
            address: Pubkey::new([byte; 32]),
            mint: mint.to_string(),
            owner: Pubkey::new([1u8; 32]),
            program: *program,
            amount,
            decimals: 6,
            frozen,
        }
    }

    fn portfolio(network: &MockNetwork) -> Portfolio {
        Portfolio::new(
            Arc::new(network.clone()),
            Pubkey::new([1u8; 32]),
            DEFAULT_REFRESH_INTERVAL,
        )
    }

    #[tokio::test]
    async fn test_refresh_loads_balance_and_holdings() {
        let network = MockNetwork::new();
        network.set_balance(1_500_000_000);
        network.set_token_accounts(
            &TOKEN_PROGRAM_ID,
            vec![
                account(2, "mintA", &TOKEN_PROGRAM_ID, 2_500_000, false),
                account(3, "mintB", &TOKEN_PROGRAM_ID, 7_000_000, true),
            ],
        );
        network.set_token_accounts(
            &TOKEN_2022_PROGRAM_ID,
            vec![account(4, "mintA", &TOKEN_2022_PROGRAM_ID, 500_000, false)],
        );

        let portfolio = portfolio(&network);
        assert_eq!(portfolio.balance().await, Decimal::ZERO);

        let snapshot = portfolio.refresh(false).await.unwrap().unwrap();
        assert_eq!(snapshot.balance(), Decimal::from_str("1.5").unwrap());
        assert_eq!(snapshot.holdings.len(), 1);

        let holding = snapshot.holding("mintA").unwrap();
        assert_eq!(holding.amount, Decimal::from(3));
        assert_eq!(holding.accounts.len(), 2);
        assert!(snapshot.holding("mintB").is_none());
    }

    #[tokio::test]
    async fn test_unforced_refresh_is_throttled() {
        let network = MockNetwork::new();
        network.set_balance(1);
        let portfolio = portfolio(&network);

        assert!(portfolio.refresh(false).await.unwrap().is_some());
        assert!(portfolio.refresh(false).await.unwrap().is_none());
        assert_eq!(network.balance_requests(), 1);

        assert!(portfolio.refresh(true).await.unwrap().is_some());
        assert_eq!(network.balance_requests(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let network = MockNetwork::new();
        network.set_balance(2_000_000_000);
        let portfolio = portfolio(&network);
        portfolio.refresh(true).await.unwrap();

        network.fail_balance(Some(NetworkError::ConnectionFailed("down".into())));
        assert!(portfolio.refresh(true).await.is_err());
        assert_eq!(portfolio.balance().await, Decimal::from(2));
    }
}
