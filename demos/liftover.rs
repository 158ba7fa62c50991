use std::env;
use std::fs::File;
use std::io::BufReader;

use consensus_qc::liftover::System;
use consensus_qc::liftover::UNMAPPED;
use consensus_qc::liftover::table;
use consensus_qc::msa;
use flate2::read::GzDecoder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let position = env::args().nth(1).expect("missing position");
    let src = env::args().nth(2).expect("missing src");

    let position = position.parse::<usize>()?;

    let msa = File::open(src)
        .map(GzDecoder::new)
        .map(BufReader::new)
        .map(msa::read)??;

    let lookup = table::Builder::default().try_build_from_msa(&msa)?;

    match lookup.lift(position, System::Reference, System::Consensus)? {
        UNMAPPED => println!("Does not exist in the consensus"),
        lifted => println!(
            "{}:{} -> {}:{}",
            msa.a().name(),
            position,
            msa.b().name(),
            lifted
        ),
    }

    Ok(())
}
