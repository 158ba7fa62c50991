use std::env;
use std::fs::File;
use std::io::BufReader;

use consensus_qc::liftover::table;
use consensus_qc::msa;
use flate2::read::GzDecoder;
use tabled::builder::Builder;
use tabled::settings::Alignment;
use tabled::settings::Style;
use tabled::settings::object::Rows;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let src = env::args().nth(1).expect("missing src");

    let msa = File::open(src)
        .map(GzDecoder::new)
        .map(BufReader::new)
        .map(msa::read)??;

    let lookup = table::Builder::default().try_build_from_msa(&msa)?;

    let mut builder = Builder::default();
    builder.push_record(["Column", msa.a().name(), "-->", msa.b().name(), "-->"]);
    builder.push_record(["", "Base", "Position", "Base", "Position"]);

    let mut a = 0;
    let mut b = 0;

    for (i, (x, y)) in msa.a().sequence().iter().zip(msa.b().sequence()).enumerate() {
        if *x != msa::GAP {
            a += 1;
        }

        if *y != msa::GAP {
            b += 1;
        }

        let a_cell = match *x == msa::GAP {
            true => format!("({})", lookup.b_to_a(b)?),
            false => a.to_string(),
        };

        let b_cell = match *y == msa::GAP {
            true => format!("({})", lookup.a_to_b(a)?),
            false => b.to_string(),
        };

        builder.push_record([
            (i + 1).to_string(),
            char::from(*x).to_string(),
            a_cell,
            char::from(*y).to_string(),
            b_cell,
        ]);
    }

    let table = builder
        .build()
        .with(Style::rounded())
        .modify(Rows::new(1..), Alignment::left())
        .to_string();

    println!("{}", table);

    Ok(())
}
