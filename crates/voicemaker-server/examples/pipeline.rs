use std::env;

use anyhow::Result;
use voicemaker_dict::Dictionary;
use voicemaker_server::{CharClassTokenizer, Tokenizer};
use voicemaker_text::{apply_filters, assemble, fixup, pretokenize};
use voicemaker_types::DictKind;

fn main() -> Result<()> {
    let text = env::args().skip(1).collect::<Vec<_>>().join(" ");
    let text = if text.is_empty() {
        "Rust版は1,234個".to_string()
    } else {
        text
    };

    let mut dict = Dictionary::new();
    dict.add_word_pair("Rust", "ラスト", DictKind::Preferred)?;
    dict.add_word_pair("版は", "バンワ", DictKind::Preferred)?;

    let pre = pretokenize(&text)?;
    println!("pretokenize: {pre}");

    let tokens = CharClassTokenizer.tokenize(&pre)?;
    let surfaces: Vec<&str> = tokens.iter().map(|t| t.surface.as_str()).collect();
    println!("tokenize:    {surfaces:?}");

    let assembled = assemble(
        &tokens,
        pre.len(),
        dict.extension_ratio(DictKind::Preferred),
        |s| dict.get_dst_word(s),
    )?;
    println!("assemble:    {assembled}");

    let filtered = apply_filters(
        &assembled,
        dict.filter_pairs(),
        dict.extension_ratio(DictKind::Filter),
    )?;
    println!("filter:      {filtered}");

    println!("fixup:       {}", fixup(&filtered)?);
    Ok(())
}
