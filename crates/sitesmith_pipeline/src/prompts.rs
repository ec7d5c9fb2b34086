//! Prompt templates for each step.

use crate::PromptContext;

fn brief(context: &PromptContext) -> String {
    let mut brief = format!(
        "Project: {}\nWebsite type: {}\nIndustry: {}\nDescription: {}",
        context.name(),
        context.website_type(),
        context.industry(),
        context.description()
    );
    if let Some(style) = context.style() {
        brief.push_str(&format!("\nStyle: {}", style));
    }
    if let Some(colors) = context.color_scheme() {
        brief.push_str(&format!("\nColour scheme: {}", colors));
    }
    brief
}

pub(crate) fn structure(context: &PromptContext) -> String {
    format!(
        "## STEP 1: SITE STRUCTURE\n\n{}\n\n\
         Create the semantic HTML5 structure for this {} website. Include a skip link, \
         header with navigation, hero with a single H1, features, about, testimonials, \
         a call to action and a footer. Give every section an id and use aria labels on \
         navigation.\n\nReturn one complete HTML document in a ```html block.",
        brief(context),
        context.website_type()
    )
}

pub(crate) fn layout(context: &PromptContext) -> String {
    format!(
        "## STEP 2: LAYOUT & GRID\n\n{}\n\n\
         Arrange the sections with CSS grid and flexbox. Use a mobile-first approach with \
         breakpoints at 640px, 1024px and 1280px, and a max content width of 1200px.\n\n\
         Return the updated code in a ```html block.",
        brief(context)
    )
}

pub(crate) fn styling(context: &PromptContext) -> String {
    let colors = context
        .color_scheme()
        .as_deref()
        .unwrap_or("a palette suited to the industry");
    format!(
        "## STEP 3: STYLING\n\n{}\n\n\
         Apply a cohesive visual design using {}. Define colours, spacing and typography \
         as CSS custom properties. Add hover and focus states and respect \
         prefers-reduced-motion.\n\nReturn the updated code in a ```html block.",
        brief(context),
        colors
    )
}

pub(crate) fn content(context: &PromptContext) -> String {
    format!(
        "## STEP 4: CONTENT\n\n{}\n\n\
         Replace placeholder text with realistic copy for a {} business in the {} industry. \
         Write headlines, service descriptions, testimonials and calls to action. Give \
         every image descriptive alt text.\n\nReturn the updated code in a ```html block.",
        brief(context),
        context.website_type(),
        context.industry()
    )
}

pub(crate) fn optimization(context: &PromptContext) -> String {
    format!(
        "## STEP 5: OPTIMIZATION\n\n{}\n\n\
         Finalise the page: add meta description and Open Graph tags, lazy-load images, \
         check heading order and colour contrast, and remove unused CSS. Keep all \
         existing content.\n\nReturn the final complete HTML document in a ```html block.",
        brief(context)
    )
}
