/*!

# Choosing Feedback

The feedback kind decides which mutated graphs are admitted to the corpus and
therefore where the fuzzer spends its effort. Pass it with
[`FuzzConfig::feedback`][crate::config::FuzzConfig::feedback] or `--feedback`
on the command line.

| Kind | Admits a graph when |
|---|---|
| `regular` | the target's signal produces a fingerprint never seen before |
| `coverage` | the implementations execute a [`probe!`][crate::probe] never hit before |
| `branch` | control passes between two probes in an order never seen before |
| `combination` | `regular` or `coverage` would |
| `none` | never; every mutation starts from a seed |

A failing signal counts as new output the first time its error message is
seen. The coverage kinds remember failure messages too, but a failure alone
never admits a graph under them.

The remaining kinds are output novelty over a target-specific signal:

| Kind | Target | Signal |
|---|---|---|
| `hop_count` | `shortest_path` | edges along the shortest path |
| `negative_edges` | `shortest_path` | negative edges along the shortest path |
| `component_distribution` | `scc` | the multiset of component sizes |
| `trivial_ratio` | `scc` | the bucketed share of single-node components |
| `saturated_edges` | `max_flow` | edges the maximum flow exhausts |
| `max_degree` | `mst` | the highest degree within the spanning tree |

Asking for one of these on a target without it falls back to `regular`, with a
warning.

To compare kinds against each other on the same target, run them side by side
with a [`Campaign`][crate::fuzzer::Campaign] (`--campaign` on the command
line).

 */
