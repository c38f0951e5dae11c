pub mod invitation;
pub mod licence;
pub mod membership;
pub mod order;
pub mod plan;
pub mod reader;

pub use invitation::{Invitation, InvitationStatus};
pub use licence::{Licence, LicenceStatus};
pub use membership::{MemberSnapshot, Membership, PayMethod, SnapshotReason};
pub use order::{LicenceTransaction, PaymentConfirmedEvent, ProcessedTransaction, TransactionKind};
pub use plan::{Cycle, Plan, Price, Tier};
pub use reader::{Assignee, Reader};
