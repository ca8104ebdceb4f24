use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};
use voicemaker_dict::{DictError, Dictionary};
use voicemaker_text::{apply_filters, assemble, fixup, pretokenize};
use voicemaker_types::DictKind;

use crate::args::{ArgValue, ConvertRequest};
use crate::error::{ConvertError, Error, Stage, StageError};
use crate::model::{LoadMode, ModelData};
use crate::synth::Synthesizer;
use crate::tokenizer::Tokenizer;

/// A conversion session: dictionaries, collaborators and the last diagnostic.
///
/// Conversions borrow the session mutably, so callers sharing one across
/// threads wrap it in a mutex.
pub struct VoiceMaker {
    dictionary: Dictionary,
    tokenizer: Box<dyn Tokenizer>,
    synthesizer: Box<dyn Synthesizer>,
    model_mode: LoadMode,
    last_diagnostic: Option<String>,
}

impl VoiceMaker {
    pub fn new(tokenizer: Box<dyn Tokenizer>, synthesizer: Box<dyn Synthesizer>) -> Self {
        Self {
            dictionary: Dictionary::new(),
            tokenizer,
            synthesizer,
            model_mode: LoadMode::Mmap,
            last_diagnostic: None,
        }
    }

    pub fn with_model_mode(mut self, mode: LoadMode) -> Self {
        self.model_mode = mode;
        self
    }

    pub fn with_dictionary(mut self, dictionary: Dictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Text of the stage preceding the most recent failure, or `""`.
    pub fn last_diagnostic(&self) -> &str {
        self.last_diagnostic.as_deref().unwrap_or("")
    }

    /// Validate positional arguments and convert.
    pub fn convert_args(&mut self, args: &[ArgValue]) -> Result<String, Error> {
        let request = ConvertRequest::from_args(args)?;
        Ok(self.convert(&request)?)
    }

    /// Run the full pipeline and return the audio as padded standard base64.
    pub fn convert(&mut self, request: &ConvertRequest) -> Result<String, ConvertError> {
        if request.text().is_empty() {
            return Ok(String::new());
        }
        match self.run(request) {
            Ok(audio) => Ok(audio),
            Err(err) => {
                warn!("conversion failed at {}: {}", err.stage, err.cause);
                self.last_diagnostic = Some(err.diagnostic.clone());
                Err(err)
            }
        }
    }

    fn run(&self, request: &ConvertRequest) -> Result<String, ConvertError> {
        let input = request.text();

        let text = pretokenize(input).map_err(|e| ConvertError::new(Stage::Pretokenize, input, e))?;
        debug!("pretokenize: {} bytes", text.len());

        let tokens = self
            .tokenizer
            .tokenize(&text)
            .map_err(|e| ConvertError::new(Stage::Tokenize, &text, e))?;
        debug!("tokenize: {} tokens", tokens.len());

        let dictionary = &self.dictionary;
        let assembled = assemble(
            &tokens,
            text.len(),
            dictionary.extension_ratio(DictKind::Preferred),
            |surface| dictionary.get_dst_word(surface),
        )
        .map_err(|e| ConvertError::new(Stage::Assemble, &text, e))?;
        drop(tokens);
        debug!("assemble: {} bytes", assembled.len());

        let filtered = apply_filters(
            &assembled,
            dictionary.filter_pairs(),
            dictionary.extension_ratio(DictKind::Filter),
        )
        .map_err(|e| ConvertError::new(Stage::Filter, &assembled, e))?;
        debug!("filter: {} bytes", filtered.len());

        let phonemes = fixup(&filtered).map_err(|e| ConvertError::new(Stage::Fixup, &filtered, e))?;
        debug!("fixup: {} bytes", phonemes.len());

        let model = match request.model() {
            Some(path) => Some(self.load_model(path, &phonemes)?),
            None => None,
        };

        let audio = self
            .synthesizer
            .synthesize(&phonemes, request.speed(), model.as_ref().map(ModelData::as_slice))
            .map_err(|e| ConvertError::new(Stage::Synthesize, &phonemes, e))?;
        drop(model);
        debug!("synthesize: {} audio bytes", audio.len());

        let encoded = encode_audio(&audio)
            .map_err(|e| ConvertError::new(Stage::Encode, &phonemes, e))?;
        debug!("encode: {} bytes", encoded.len());
        Ok(encoded)
    }

    fn load_model(&self, path: &Path, diagnostic: &str) -> Result<ModelData, ConvertError> {
        let model = ModelData::load(path, self.model_mode)
            .map_err(|e| ConvertError::new(Stage::ModelLoad, diagnostic, e))?;
        debug!(
            "model load: {} bytes from {}",
            model.as_slice().len(),
            path.display()
        );
        Ok(model)
    }

    pub fn set_dictionary_paths(
        &mut self,
        preferred: impl AsRef<Path>,
        filter: impl AsRef<Path>,
    ) -> Result<(), DictError> {
        self.dictionary.set_paths(preferred, filter)
    }

    pub fn load_dictionary(&mut self) -> Result<(), DictError> {
        self.dictionary.load()
    }

    pub fn save_dictionary(&self) -> Result<(), DictError> {
        self.dictionary.save()
    }

    pub fn add_word_pair(
        &mut self,
        source: &str,
        destination: &str,
        kind: DictKind,
    ) -> Result<(), DictError> {
        self.dictionary.add_word_pair(source, destination, kind)
    }

    pub fn del_word_pair(&mut self, source: &str, kind: DictKind) -> usize {
        self.dictionary.del_word_pair(source, kind)
    }

    pub fn get_dst_word(&self, source: &str) -> Option<&str> {
        self.dictionary.get_dst_word(source)
    }
}

fn encode_audio(audio: &[u8]) -> Result<String, StageError> {
    let len = base64::encoded_len(audio.len(), true).ok_or(StageError::EncodeAlloc(usize::MAX))?;
    let mut out = String::new();
    out.try_reserve_exact(len)
        .map_err(|_| StageError::EncodeAlloc(len))?;
    STANDARD.encode_string(audio, &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{SynthError, Unconfigured};
    use crate::tokenizer::CharClassTokenizer;

    struct Echo;

    impl Synthesizer for Echo {
        fn synthesize(&self, phonemes: &str, _: u16, _: Option<&[u8]>) -> Result<Vec<u8>, SynthError> {
            Ok(phonemes.as_bytes().to_vec())
        }
    }

    #[test]
    fn encodes_with_padding() {
        assert_eq!(encode_audio(b"ab").unwrap(), "YWI=");
        assert_eq!(encode_audio(b"").unwrap(), "");
    }

    #[test]
    fn empty_text_skips_every_stage() {
        let mut session = VoiceMaker::new(Box::new(CharClassTokenizer), Box::new(Unconfigured));
        let request = ConvertRequest::new("").unwrap();
        assert_eq!(session.convert(&request).unwrap(), "");
        assert_eq!(session.last_diagnostic(), "");
    }

    #[test]
    fn echoed_audio_is_the_fixed_up_text() {
        let mut session = VoiceMaker::new(Box::new(CharClassTokenizer), Box::new(Echo));
        let audio = session
            .convert_args(&[ArgValue::Str("ab 12個".into())])
            .unwrap();
        let decoded = STANDARD.decode(audio).unwrap();
        assert_eq!(decoded, "ab<NUMK VAL=12 COUNTER=個>".as_bytes());
    }

    #[test]
    fn synthesis_failure_records_fixup_output() {
        let mut session = VoiceMaker::new(Box::new(CharClassTokenizer), Box::new(Unconfigured));
        let request = ConvertRequest::new("ab 3個").unwrap();
        let err = session.convert(&request).unwrap_err();
        assert_eq!(err.stage, Stage::Synthesize);
        assert_eq!(err.diagnostic, "ab<NUMK VAL=3 COUNTER=個>");
        assert_eq!(session.last_diagnostic(), err.diagnostic);
    }
}
