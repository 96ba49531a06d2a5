use std::io::{self, Read};

fn main() {
    let mut html = String::new();
    io::stdin().read_to_string(&mut html).expect("read stdin");
    match html2blocks::convert(&html) {
        Ok(doc) => {
            let json = serde_json::to_string_pretty(&doc).expect("serialize document");
            println!("{json}");
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
