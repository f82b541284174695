//! Configuration for the engine and its deployment.
//!
//! - Engine configuration (solvency profile, event delivery)
//! - Deployment configuration (engine identity, tokens, feeds)

mod deployment;
mod engine;

pub use deployment::{
    load_deployment, load_deployment_from_env, CollateralEntry, DeploymentConfig, EngineSection,
    FeedEntry, ResolvedCollateral, ResolvedDeployment, ResolvedFeed, ResolvedSynthetic,
    SyntheticSection,
};
pub use engine::{EngineConfig, EventConfig, MintCheck, SolvencyPolicy};
