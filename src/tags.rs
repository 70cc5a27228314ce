//! Shorthands for [`build`] with common HTML tags.
//!
//! ```rust
//! use xylem_dom::{tags::{li, ul}, Props};
//!
//! let list = ul(Props::new(), [li(Props::new().with("key", 1), "one"), li(Props::new().with("key", 2), "two")]).unwrap();
//! assert_eq!(list.as_element().unwrap().children().unwrap().len(), 2);
//! ```

use crate::{build, BuildError, Children, Props, VNode};

macro_rules! tags {
	($($tag:ident),*$(,)?) => {$(
		#[doc = concat!("Builds a `<", stringify!($tag), ">` element.")]
		///
		/// # Errors
		///
		/// See [`build`].
		pub fn $tag(props: Props, children: impl Into<Children>) -> Result<VNode, BuildError> {
			build(stringify!($tag), props, children)
		}
	)*};
}

tags![
	a, article, aside, button, code, div, em, footer, form, h1, h2, h3, h4, header, img, input, label, li, nav, ol, option, p, pre, section, select, small, span,
	strong, table, tbody, td, textarea, th, thead, tr, ul,
];
