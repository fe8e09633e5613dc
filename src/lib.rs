pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod offers;
pub mod platform;
pub mod processor;
pub mod schedule;
pub mod store;
pub mod types;

// re-export key types
pub use config::PlatformConfig;
pub use decimal::{Money, Rate};
pub use errors::{LendingError, Result};
pub use events::{Event, EventStore};
pub use ledger::{Account, Ledger};
pub use loan::Loan;
pub use offers::Offer;
pub use platform::LendingPlatform;
pub use processor::{
    FailedSettlement, RepaymentProcessor, RepaymentRunReport, SettlementOutcome, RUN_INTERVAL,
};
pub use schedule::{InstallmentSchedule, Payment};
pub use store::{PlatformState, Store};
pub use types::{
    LoanId, LoanStatus, OfferId, OfferStatus, PaymentId, PaymentStatus, Role, UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
