/*!

Tutorials, overviews, and etc... for the `graphfuzz` crate.

All the documentation that isn't API reference.

# Table of Contents

* [Fuzzing Your Own Algorithm][custom_targets]
* [Choosing Feedback][feedback]
* [Output Artifacts][artifacts]
* [Cargo Features][cargo_features]
* [Minimum Supported Rust Version][msrv]

 */

pub mod artifacts;
pub mod cargo_features;
pub mod custom_targets;
pub mod feedback;
pub mod msrv;
