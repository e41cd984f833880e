//! JVM management: system JDK discovery, managed JDK provisioning
//! (Temurin/Corretto/Zulu), JVM command construction, and child-process
//! launch.

pub mod discovery;
pub mod download;
pub mod launch;
pub mod provision;
