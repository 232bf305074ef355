//! fortunas-infra: synthesizes the deployment template for the fortunasbet.com
//! static site, its serverless API, and the surrounding DNS, auth, and
//! observability resources. One synchronous pass per invocation; everything
//! operational (provisioning order, rollback, propagation) belongs to the
//! deployment tool.

pub mod assets;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod naming;
pub mod stacks;
pub mod template;
