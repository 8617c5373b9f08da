//! Built-in example shown when the studio first opens.

use crate::application::bridge::{decode, BridgeError};
use crate::domain::params::{
    AspectRatio, GenerationMode, RequestBuilder, Resolution, VeoModel,
};

pub const PRESENTER_FILE_NAME: &str = "presenter.png";

const PRESENTER_BASE64: &str = include_str!("../../assets/presenter.png.b64");

pub const INITIAL_PROMPT: &str = "An anime-style 3D corporate presentation about a retail analytics tool. \
The style is futuristic with soft lighting, using a palette of neon green, gold, and holographic blue. \
A charismatic, curious 3D presenter avatar introduces the tool and shows how it spots new products \
that have not sold yet, with holographic BI dashboards and a store supervisor at work. \
Keep it light and visual, and end on a short call to action.";

/// Form values for the first run: the presenter image as the single
/// reference, the presentation prompt, and default output settings.
pub fn initial_form() -> Result<RequestBuilder, BridgeError> {
    let presenter = decode(PRESENTER_BASE64, PRESENTER_FILE_NAME)?;

    Ok(RequestBuilder::new(GenerationMode::ReferencesToVideo)
        .prompt(INITIAL_PROMPT)
        .model(VeoModel::Veo)
        .aspect_ratio(AspectRatio::Landscape)
        .resolution(Resolution::P720)
        .reference(presenter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_form_decodes_presenter() {
        let form = initial_form().unwrap();
        let request = form.build().unwrap();

        assert_eq!(request.mode(), GenerationMode::ReferencesToVideo);
        assert_eq!(request.reference_images().len(), 1);

        let presenter = &request.reference_images()[0];
        assert_eq!(presenter.mime_type(), "image/png");
        assert!(presenter.bytes().starts_with(b"\x89PNG"));
        assert!(request.start_frame().is_none());
        assert!(request.input_video().is_none());
    }
}
