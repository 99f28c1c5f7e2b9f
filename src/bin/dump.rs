//! Dump back to back messages from stdin as text with byte offsets for
//! debugging
//!
//! The IR is read from the path given as the first argument, serialized as
//! JSON. Here is some sample output:
//!
//! ```text
//!           : Order {
//!          8:   price=uint32:12345
//!           :   legs[2]
//!           :   legs#0 {
//!         19:     leg=uint32:7
//!           :   }
//!           :   legs#1 {
//!         23:     leg=uint32:9
//!           :   }
//!           : }
//! ```

use sbe_otf::{dump::DumpListener, Ir, OtfDecoder};
use std::{
    env, error,
    fs::File,
    io::{self, BufReader, BufWriter, Read},
};

fn main() -> Result<(), Box<dyn error::Error>> {
    let path = env::args().nth(1).ok_or("expected path to an IR JSON file")?;
    let ir: Ir = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    ir.validate()?;

    let mut data = Vec::new();
    io::stdin().read_to_end(&mut data)?;

    let stdout = io::stdout();
    let mut listener = DumpListener::new(BufWriter::new(stdout.lock()));
    let count = OtfDecoder::new(&ir)?.decode_stream(&data, &mut listener)?;
    log::debug!("dumped {} messages", count);
    Ok(())
}
