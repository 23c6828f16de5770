// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

mod engine;
mod error;
mod membership;

pub use engine::{ExecutionReport, ProposalEngine, ProposalView};
pub use error::{GovernanceError, GovernanceResult};
pub use membership::MembershipRegistry;
