//! Prompt rendering for component code generation.

/// Render the single prompt sent to the generation model.
///
/// Output depends only on the two inputs, which are embedded as given.
pub fn render_component_prompt(component: &str, description: &str) -> String {
    format!(
        r#"You are an expert embedded systems engineer writing firmware for hobby microcontroller boards such as Arduino.

Write code for the following component and behavior.

## Component
{component}

## Desired behavior
{description}

## Requirements
1. Produce complete, runnable code. Do not leave placeholders or omit sections.
2. Include the initialization entry point (`setup()`) and the main loop entry point (`loop()`).
3. Declare every pin and hardware resource the component uses as named constants near the top of the file.
4. Add explanatory comments describing what each part of the code does.
5. If the component needs an external library, include the required `#include` directive and add a one-line comment naming the library to install.

Return only the code."#
    )
}
