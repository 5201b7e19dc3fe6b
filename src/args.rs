//! Command line validation for the driver: `<nsteps> <input file> <output file>`.

use std::{fs::File, path::PathBuf};

use crate::error::ArgError;

#[derive(Clone, Debug, PartialEq)]
pub struct RunArgs {
    pub num_steps: usize,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Step count must be a positive integer.
pub fn check_num_steps(val: &str) -> Result<usize, ArgError> {
    let n: i64 = val
        .trim()
        .parse()
        .map_err(|_| ArgError::NonNumericSteps(val.to_owned()))?;

    if n <= 0 {
        return Err(ArgError::NonPositiveSteps(n));
    }
    Ok(n as usize)
}

impl RunArgs {
    /// `args` includes the program name, as from `std::env::args`. Checks run in order: count,
    /// step count, input readable, output absent.
    pub fn parse(args: &[String]) -> Result<Self, ArgError> {
        if args.len() != 4 {
            return Err(ArgError::Count(args.len().saturating_sub(1)));
        }

        let num_steps = check_num_steps(&args[1])?;

        // Opening a directory succeeds on some platforms, so check it's a file too.
        let input = PathBuf::from(&args[2]);
        if !input.is_file() || File::open(&input).is_err() {
            return Err(ArgError::InputUnreadable(input));
        }

        let output = PathBuf::from(&args[3]);
        if output.exists() {
            return Err(ArgError::OutputExists(output));
        }

        Ok(Self {
            num_steps,
            input,
            output,
        })
    }
}
