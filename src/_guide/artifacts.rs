/*!

# Output Artifacts

When an output directory is configured
([`FuzzConfig::output_dir`][crate::config::FuzzConfig::output_dir] or
`--output-dir`), a run leaves these JSON files behind, named after the target:

* `<target>_discrepancies.jsonl`: one line per discrepancy found, appended as
  they are found, up to the configured cap per distinct message. The file is
  reopened and appended to by later runs, and its counts carry over. A
  truncated last line, as left by a crash mid-write, is dropped with a
  warning; damage anywhere else is an error, since restarting the log would
  lose what it recorded.

* `<target>_exceptions.json`: each distinct failure message seen by the
  feedback oracle, including timeouts, with the graph that first produced it.

* `<target>_corpus.json`: a snapshot of the corpus at the end of the run. Pass
  it to the next run with `--corpus` to pick up where this one left off. An
  unreadable snapshot is skipped with a warning.

A [`Campaign`][crate::fuzzer::Campaign] puts each feedback kind's files in a
subdirectory named after the kind.

The disk scheduler (`--scheduler disk`) additionally keeps one file per corpus
graph in its folder, written atomically and named
`graph-{unix millis}-{sequence}-{random id}.json`. It resumes from whatever it
finds there. Several runs may share one folder: none overwrites another's
entries, and each picks up the graphs the others admit.

Graphs serialize as

```json
{"directed":true,"multigraph":false,"nodes":[0,1],"edges":[{"source":0,"target":1,"weight":"NaN"}]}
```

Non-finite weights are written as the strings `"NaN"`, `"inf"` and `"-inf"`.

 */
