pub mod manifests;
pub mod naming;
pub mod objects;
