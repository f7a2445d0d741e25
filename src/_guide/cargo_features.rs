/*!

# Cargo Features

* **`cli`** (enabled by default): Build the `graphfuzz` command-line driver.
  This pulls in `clap` for argument parsing, `env_logger` to print the
  library's [`log`](https://docs.rs/log) output, `ctrlc` for graceful
  interruption, and `anyhow` for error reporting.

  Disable default features when you only use `graphfuzz` as a library:

  ```toml
  [dependencies]
  graphfuzz = { version = "0.1", default-features = false }
  ```

The library logs through the `log` facade unconditionally; install whichever
logger you like to see its output.

 */
