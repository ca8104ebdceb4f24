use std::io::Write;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use voicemaker_server::{
    ArgValue, CharClassTokenizer, ConvertRequest, Error, ErrorCategory, LoadMode, Stage,
    SynthError, Synthesizer, TokenizeError, Tokenizer, VoiceMaker,
};
use voicemaker_types::{DictKind, Token};

#[derive(Clone, Debug, PartialEq)]
struct Call {
    phonemes: String,
    speed: u16,
    model: Option<Vec<u8>>,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Synthesizer for Recorder {
    fn synthesize(
        &self,
        phonemes: &str,
        speed: u16,
        model: Option<&[u8]>,
    ) -> Result<Vec<u8>, SynthError> {
        self.calls.lock().unwrap().push(Call {
            phonemes: phonemes.to_string(),
            speed,
            model: model.map(<[u8]>::to_vec),
        });
        Ok(b"RIFF".to_vec())
    }
}

/// Tokenizer with canned annotations, standing in for mecab.
struct Canned(Vec<Token>);

impl Tokenizer for Canned {
    fn tokenize(&self, _: &str) -> Result<Vec<Token>, TokenizeError> {
        Ok(self.0.clone())
    }
}

struct Broken;

impl Tokenizer for Broken {
    fn tokenize(&self, _: &str) -> Result<Vec<Token>, TokenizeError> {
        Err(TokenizeError::Utf8)
    }
}

fn session(recorder: &Recorder) -> VoiceMaker {
    VoiceMaker::new(Box::new(CharClassTokenizer), Box::new(recorder.clone()))
}

#[test]
fn returns_base64_audio_and_passes_speed() {
    let recorder = Recorder::default();
    let mut vm = session(&recorder);
    let audio = vm
        .convert_args(&[ArgValue::Str("hello".into()), ArgValue::Int(150)])
        .unwrap();
    assert_eq!(STANDARD.decode(audio).unwrap(), b"RIFF");

    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].phonemes, "hello");
    assert_eq!(calls[0].speed, 150);
    assert_eq!(calls[0].model, None);
}

#[test]
fn annotations_and_dictionaries_shape_the_phonemes() {
    let recorder = Recorder::default();
    let tokens = vec![
        Token::new("東京", "名詞,固有名詞,地域,一般,*,*,東京,トウキョウ,トーキョー"),
        Token::new("Rust", "名詞,一般,*,*,*,*,*"),
        Token::new("ヴァ", ""),
    ];
    let mut vm = VoiceMaker::new(Box::new(Canned(tokens)), Box::new(recorder.clone()));
    vm.add_word_pair("Rust", "ラスト", DictKind::Preferred).unwrap();
    vm.add_word_pair("ヴァ", "バ", DictKind::Filter).unwrap();

    vm.convert(&ConvertRequest::new("東京Rustヴァ").unwrap())
        .unwrap();
    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls[0].phonemes, "トーキョーラストバ");
}

#[test]
fn model_bytes_reach_the_synthesizer() {
    let recorder = Recorder::default();
    let mut model = tempfile::NamedTempFile::new().unwrap();
    model.write_all(b"phont-data").unwrap();

    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let mut vm = session(&recorder).with_model_mode(mode);
        let request = ConvertRequest::new("a")
            .unwrap()
            .with_model(model.path());
        vm.convert(&request).unwrap();
    }
    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.model.as_deref() == Some(b"phont-data".as_slice())));
}

#[test]
fn missing_model_is_a_resource_error() {
    let recorder = Recorder::default();
    let mut vm = session(&recorder);
    let dir = tempfile::tempdir().unwrap();
    let args = [
        ArgValue::Str("ab 3個".into()),
        ArgValue::Str(dir.path().join("none.phont").display().to_string()),
    ];
    let err = vm.convert_args(&args).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
    let err = match err {
        Error::Convert(err) => err,
        other => panic!("expected a conversion error, got {other:?}"),
    };
    assert_eq!(err.stage, Stage::ModelLoad);
    assert_eq!(err.diagnostic, "ab<NUMK VAL=3 COUNTER=個>");
    assert!(recorder.calls.lock().unwrap().is_empty());
}

#[test]
fn tokenizer_failure_keeps_pretokenized_text() {
    let mut vm = VoiceMaker::new(Box::new(Broken), Box::new(Recorder::default()));
    let err = vm
        .convert(&ConvertRequest::new("Rustで").unwrap())
        .unwrap_err();
    assert_eq!(err.stage, Stage::Tokenize);
    assert_eq!(err.diagnostic, "Rust で");
    assert_eq!(vm.last_diagnostic(), "Rust で");
}

#[test]
fn later_failure_overwrites_diagnostic() {
    let mut vm = VoiceMaker::new(Box::new(Broken), Box::new(Recorder::default()));
    vm.convert(&ConvertRequest::new("first").unwrap()).unwrap_err();
    vm.convert(&ConvertRequest::new("second").unwrap()).unwrap_err();
    assert_eq!(vm.last_diagnostic(), "second");
}

#[test]
fn validation_errors_do_not_touch_the_diagnostic() {
    let mut vm = session(&Recorder::default());
    let err = vm
        .convert_args(&[ArgValue::Str("a".into()), ArgValue::Int(29)])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(vm.last_diagnostic(), "");
}

#[test]
fn empty_text_skips_synthesis() {
    let recorder = Recorder::default();
    let mut vm = session(&recorder);
    assert_eq!(vm.convert_args(&[ArgValue::Str(String::new())]).unwrap(), "");
    assert!(recorder.calls.lock().unwrap().is_empty());
    assert_eq!(vm.last_diagnostic(), "");
}

#[test]
fn chained_filters_growing_past_the_ratio_still_convert() {
    let recorder = Recorder::default();
    let mut vm = session(&recorder);
    vm.add_word_pair("=", "イコール", DictKind::Filter).unwrap();
    vm.add_word_pair("イ", "イー", DictKind::Filter).unwrap();

    vm.convert(&ConvertRequest::new("=").unwrap()).unwrap();
    assert_eq!(recorder.calls.lock().unwrap()[0].phonemes, "イーコール");
    assert_eq!(vm.last_diagnostic(), "");
}
