//! Decode back to back messages from stdin and print each as a line of JSON
//!
//! The IR is read from the path given as the first argument, serialized as
//! JSON. Pass `--pretty` as the second argument to pretty print.

use sbe_otf::{
    json::{JsonOptions, JsonPrinter},
    Ir,
};
use std::{
    env, error,
    fs::File,
    io::{self, BufReader, Read},
};

fn main() -> Result<(), Box<dyn error::Error>> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).ok_or("expected path to an IR JSON file")?;
    let ir: Ir = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    ir.validate()?;

    let mut data = Vec::new();
    io::stdin().read_to_end(&mut data)?;

    let pretty = args.get(2).map(|x| x.as_str()) == Some("--pretty");
    let options = JsonOptions::new().with_prettyprint(pretty);
    let stdout = io::stdout();
    JsonPrinter::new(&ir)
        .with_options(options)
        .print_stream(&data, stdout.lock())?;

    Ok(())
}
