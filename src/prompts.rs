//! Prompts sent to the vision model by the AI vectorizer.
//!
//! Kept in one place so prompt changes never touch retry or validation logic
//! in [`crate::pipeline::vectorize`], and so tests can inspect the text.

/// Fixed instruction asking the model for a bare Android vector drawable.
///
/// The response is validated structurally: it must start with `<vector` and
/// end with `</vector>` once trimmed.
pub const VECTOR_DRAWABLE_PROMPT: &str = r#"You are an expert in Android development and vector graphics. Convert the attached raster image into a concise Android Vector Drawable XML document.

Follow these rules precisely:

1. The image is an icon. Use a single <path> element with android:pathData if at all possible.
2. Choose android:viewportWidth and android:viewportHeight as simple integers (e.g. 24x24) that match the icon's aspect ratio, and set android:width/android:height to the same values in dp.
3. Output ONLY the raw XML, starting with "<vector" and ending with "</vector>".
4. Do NOT include any explanation, surrounding text, or markdown code fences."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_required_shape() {
        assert!(VECTOR_DRAWABLE_PROMPT.contains("<vector"));
        assert!(VECTOR_DRAWABLE_PROMPT.contains("</vector>"));
        assert!(VECTOR_DRAWABLE_PROMPT.contains("single <path>"));
        assert!(VECTOR_DRAWABLE_PROMPT.contains("code fences"));
    }
}
