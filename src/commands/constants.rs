// src/commands/constants.rs

use std::process::ExitCode;

use helperlib_runtime::module_init;

/// Print the constants the code generator reads from the module.
pub fn print_constants() -> ExitCode {
    let module = match module_init() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("buffer_view_size  {}", module.buffer_view_size);
    println!("long_min          {}", module.long_min);
    println!("long_max          {}", module.long_max);
    ExitCode::SUCCESS
}
