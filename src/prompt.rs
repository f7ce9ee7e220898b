use crate::formats::Category;

pub fn system_prompt() -> String {
    "You are a personalised picture-book author for children aged 4 to 7 and their parents.\n\
Write warm, gentle, educational stories.\n\
\n\
Response format (JSON):\n\
```json\n\
{\n\
  \"title\": \"story title\",\n\
  \"scenes\": [\n\
    {\n\
      \"description\": \"scene narration (Korean, soft spoken style)\",\n\
      \"imagePrompt\": \"Detailed English prompt for image generation, keeping the child's appearance consistent\"\n\
    }\n\
  ],\n\
  \"growthPoint\": \"one-line growth note for the parent\",\n\
  \"detectedMode\": \"daily|creative|hero\"\n\
}\n\
```\n\
\n\
Story modes:\n\
1. daily: retell a real event from the child's day and give it educational meaning.\n\
2. creative: a fantasy that opens with \"once upon a time\" and has a clear arc.\n\
3. hero: the child becomes a hero or a fairy; describe their appearance.\n\
\n\
Writing guide:\n\
- Language: warm, soft, spoken Korean.\n\
- Structure: 10 to 15 scenes, each 3 to 4 paragraphs.\n\
- The story must have a clear beginning, development, climax and ending.\n\
- imagePrompt: English, detailed, consistent look for the child.\n\
- growthPoint: the educational value in a single line.\n\
\n\
Respond with valid JSON only."
        .to_owned()
}

pub fn user_prompt(user_input: &str, mode: Option<Category>, has_image: bool) -> String {
    let mode_guide = match mode {
        Some(mode) => format!("Selected mode: {mode}. Write the story for this mode."),
        None => "Analyse the request and pick the most suitable mode yourself.".to_owned(),
    };

    let subject = if has_image {
        "Make the child in the attached photo the main character.\n\
Observe their features (hair colour, clothes, apparent age) and reflect them consistently in every imagePrompt."
    } else {
        "There is no photo, so imagine a generic cute child character.\n\
Base every imagePrompt on \"a cute young child (4-7 years old)\"."
    };

    format!(
        "Write a rich picture-book story for a 4 to 7 year old based on the following request:\n\
\n\
\"{user_input}\"\n\
\n\
{mode_guide}\n\
\n\
{subject}\n\
\n\
Use 10 to 15 scenes, each written in 3 to 4 paragraphs.\n\
\n\
Respond with JSON only.",
        user_input = user_input.trim(),
    )
}

/// Single text part sent to the model: system instructions followed by the request.
pub fn story_prompt(user_input: &str, mode: Option<Category>, has_image: bool) -> String {
    format!(
        "{}\n\n{}",
        system_prompt(),
        user_prompt(user_input, mode, has_image)
    )
}
