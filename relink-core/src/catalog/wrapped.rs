//! Images wrapped in a link: `[![alt](image)](target)`.
//!
//! Both the image and the link target have to resolve. The resulting
//! `resource` embed links to the target by permanent id where it can, and
//! keeps a literal `href` where an id cannot express the target.

use crate::markup::{LinkMatch, MarkupError, ResourceEmbed, ResourceLink};
use crate::models::ContentRecord;
use serde::Serialize;

/// Which branch of the wrapped-image rewrite applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappedCase {
    ImageUnresolved,
    LinkUnresolved,
    CrossSite,
    Fragment,
    ImageOnly,
    ImageWithText,
}

/// What the outer link points at
#[derive(Debug, Clone)]
pub(crate) enum OuterTarget<'s> {
    Unresolved,
    SameSite(&'s ContentRecord),
    /// A record in another site, addressed by its canonical URL
    CrossSite(String),
}

#[derive(Debug, Clone)]
pub(crate) struct WrappedImage {
    /// The image, with spans relative to the link text
    pub image: LinkMatch,
    /// Link text around the image, trimmed
    pub text: String,
}

/// The single image inside a link's text, if there is exactly one
pub(crate) fn wrapped_image(found: &LinkMatch) -> Option<WrappedImage> {
    if found.link.is_image {
        return None;
    }
    let mut nested = found.nested();
    let image = nested.next().filter(|m| m.link.is_image)?;
    if nested.next().is_some() {
        return None;
    }

    let text = &found.link.text;
    let before = text[..image.span.start].trim();
    let after = text[image.span.end..].trim();
    let around = match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before} {after}"),
    };

    Some(WrappedImage {
        image,
        text: around,
    })
}

/// Rewrite a wrapped image; `None` leaves the source as it is
///
/// `destination` is the outer link's destination as written.
pub(crate) fn rewrite_wrapped(
    image: Option<&ContentRecord>,
    outer: &OuterTarget<'_>,
    destination: &str,
    text: &str,
) -> Result<(Option<String>, WrappedCase), MarkupError> {
    let Some(image) = image else {
        return Ok((None, WrappedCase::ImageUnresolved));
    };
    let embed = ResourceEmbed::new(image.text_id.as_str())?;

    let target = match outer {
        OuterTarget::Unresolved => return Ok((None, WrappedCase::LinkUnresolved)),
        OuterTarget::CrossSite(url) => {
            let markup = embed.with_href_url(url.as_str()).to_markup();
            return Ok((Some(markup), WrappedCase::CrossSite));
        }
        OuterTarget::SameSite(target) => target,
    };

    if destination.contains('#') {
        let markup = embed.with_href_url(destination).to_markup();
        return Ok((Some(markup), WrappedCase::Fragment));
    }

    let embed = embed.with_href_record(target.text_id.as_str())?.to_markup();
    if text.is_empty() {
        Ok((Some(embed), WrappedCase::ImageOnly))
    } else {
        let link = ResourceLink::new(target.text_id.as_str(), text)?.to_markup();
        Ok((Some(format!("{embed} {link}")), WrappedCase::ImageWithText))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::find_links;

    const IMG: &str = "11111111-1111-4111-8111-111111111111";
    const PAGE: &str = "22222222-2222-4222-8222-222222222222";

    fn parse(text: &str) -> LinkMatch {
        find_links(text).next().unwrap()
    }

    #[test]
    fn test_wrapped_image_detection() {
        let wrapped = wrapped_image(&parse("[![alt](a.png) caption](b)")).unwrap();
        assert_eq!(wrapped.image.link.destination, "a.png");
        assert_eq!(wrapped.text, "caption");

        assert!(wrapped_image(&parse("[text](b)")).is_none());
        assert!(wrapped_image(&parse("[[inner](c)](b)")).is_none());
        assert!(wrapped_image(&parse("[![a](x) ![b](y)](b)")).is_none());
        assert!(wrapped_image(&parse("![alt](a.png)")).is_none());
    }

    #[test]
    fn test_precedence() {
        let image = ContentRecord::new(IMG, "s", "resource");
        let page = ContentRecord::new(PAGE, "s", "page");
        let same = OuterTarget::SameSite(&page);

        let (text, case) = rewrite_wrapped(None, &same, "/p", "").unwrap();
        assert_eq!((text, case), (None, WrappedCase::ImageUnresolved));

        let (text, case) =
            rewrite_wrapped(Some(&image), &OuterTarget::Unresolved, "/p", "").unwrap();
        assert_eq!((text, case), (None, WrappedCase::LinkUnresolved));

        let cross = OuterTarget::CrossSite("/courses/other/pages/p#x".to_string());
        let (text, case) = rewrite_wrapped(Some(&image), &cross, "/other/pages/p#x", "").unwrap();
        assert_eq!(case, WrappedCase::CrossSite);
        assert_eq!(
            text.unwrap(),
            format!(r#"{{{{< resource uuid="{IMG}" href="/courses/other/pages/p#x" >}}}}"#)
        );

        let (text, case) = rewrite_wrapped(Some(&image), &same, "/p#sec", "caption").unwrap();
        assert_eq!(case, WrappedCase::Fragment);
        assert_eq!(
            text.unwrap(),
            format!(r#"{{{{< resource uuid="{IMG}" href="/p#sec" >}}}}"#)
        );

        let (text, case) = rewrite_wrapped(Some(&image), &same, "/p", "").unwrap();
        assert_eq!(case, WrappedCase::ImageOnly);
        assert_eq!(
            text.unwrap(),
            format!(r#"{{{{< resource uuid="{IMG}" href_uuid="{PAGE}" >}}}}"#)
        );

        let (text, case) = rewrite_wrapped(Some(&image), &same, "/p", "caption").unwrap();
        assert_eq!(case, WrappedCase::ImageWithText);
        assert_eq!(
            text.unwrap(),
            format!(
                r#"{{{{< resource uuid="{IMG}" href_uuid="{PAGE}" >}}}} {{{{% resource_link "{PAGE}" "caption" %}}}}"#
            )
        );
    }
}
