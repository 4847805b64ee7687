//! The HTML tag table and element constructors.
//!
//! Mechanical data: one meta entry and one constructor per tag.
//! Normal tags take an attribute list and a body, void tags take
//! attributes only and so can never be handed children.

use crate::{attr::ToAttrs,
            error::StructureError,
            node::{Element, Node, ToBody}};

/// Identity of a markup tag: its name and whether it closes (void
/// elements do not and take no children).
#[derive(Debug, PartialEq, Eq)]
pub struct ElementMeta {
    pub tag_name: &'static str,
    pub has_closing_tag: bool,
}

/// Build a markup element from any meta. Fails fast on structural
/// misuse: a void meta with children, or an empty tag name.
pub fn element(meta: &'static ElementMeta,
               attr: impl ToAttrs,
               body: impl ToBody) -> Result<Node, StructureError> {
    let body = body.to_body();
    if meta.tag_name.is_empty() {
        return Err(StructureError::EmptyTag);
    }
    if !meta.has_closing_tag && !body.is_empty() {
        return Err(StructureError::VoidWithChildren { tag: meta.tag_name });
    }
    Ok(Node::Element(Element {
        meta,
        attr: attr.to_attrs(),
        body,
    }))
}

macro_rules! normal_tags {
    ($($fname:ident $tag:literal $meta:ident;)*) => {
        $(
            pub static $meta: ElementMeta = ElementMeta {
                tag_name: $tag,
                has_closing_tag: true,
            };

            #[doc = concat!("`<", $tag, ">` element.")]
            pub fn $fname(attr: impl ToAttrs, body: impl ToBody) -> Node {
                Node::Element(Element {
                    meta: &$meta,
                    attr: attr.to_attrs(),
                    body: body.to_body(),
                })
            }
        )*
    }
}

macro_rules! void_tags {
    ($($fname:ident $tag:literal $meta:ident;)*) => {
        $(
            pub static $meta: ElementMeta = ElementMeta {
                tag_name: $tag,
                has_closing_tag: false,
            };

            #[doc = concat!("`<", $tag, " />` void element; takes no children.")]
            pub fn $fname(attr: impl ToAttrs) -> Node {
                Node::Element(Element {
                    meta: &$meta,
                    attr: attr.to_attrs(),
                    body: Vec::new(),
                })
            }
        )*
    }
}

normal_tags! {
    a "a" A_META;
    abbr "abbr" ABBR_META;
    address "address" ADDRESS_META;
    article "article" ARTICLE_META;
    aside "aside" ASIDE_META;
    audio "audio" AUDIO_META;
    b "b" B_META;
    bdi "bdi" BDI_META;
    bdo "bdo" BDO_META;
    blockquote "blockquote" BLOCKQUOTE_META;
    body "body" BODY_META;
    button "button" BUTTON_META;
    canvas "canvas" CANVAS_META;
    caption "caption" CAPTION_META;
    cite "cite" CITE_META;
    code "code" CODE_META;
    colgroup "colgroup" COLGROUP_META;
    data "data" DATA_META;
    datalist "datalist" DATALIST_META;
    dd "dd" DD_META;
    del "del" DEL_META;
    details "details" DETAILS_META;
    dfn "dfn" DFN_META;
    dialog "dialog" DIALOG_META;
    div "div" DIV_META;
    dl "dl" DL_META;
    dt "dt" DT_META;
    em "em" EM_META;
    fieldset "fieldset" FIELDSET_META;
    figcaption "figcaption" FIGCAPTION_META;
    figure "figure" FIGURE_META;
    footer "footer" FOOTER_META;
    form "form" FORM_META;
    h1 "h1" H1_META;
    h2 "h2" H2_META;
    h3 "h3" H3_META;
    h4 "h4" H4_META;
    h5 "h5" H5_META;
    h6 "h6" H6_META;
    head "head" HEAD_META;
    header "header" HEADER_META;
    hgroup "hgroup" HGROUP_META;
    html "html" HTML_META;
    i "i" I_META;
    iframe "iframe" IFRAME_META;
    ins "ins" INS_META;
    kbd "kbd" KBD_META;
    label "label" LABEL_META;
    legend "legend" LEGEND_META;
    li "li" LI_META;
    main "main" MAIN_META;
    map "map" MAP_META;
    mark "mark" MARK_META;
    menu "menu" MENU_META;
    meter "meter" METER_META;
    nav "nav" NAV_META;
    noscript "noscript" NOSCRIPT_META;
    object "object" OBJECT_META;
    ol "ol" OL_META;
    optgroup "optgroup" OPTGROUP_META;
    option "option" OPTION_META;
    output "output" OUTPUT_META;
    p "p" P_META;
    picture "picture" PICTURE_META;
    pre "pre" PRE_META;
    progress "progress" PROGRESS_META;
    q "q" Q_META;
    rp "rp" RP_META;
    rt "rt" RT_META;
    ruby "ruby" RUBY_META;
    s "s" S_META;
    samp "samp" SAMP_META;
    script "script" SCRIPT_META;
    section "section" SECTION_META;
    select "select" SELECT_META;
    slot "slot" SLOT_META;
    small "small" SMALL_META;
    span "span" SPAN_META;
    strong "strong" STRONG_META;
    style "style" STYLE_META;
    sub "sub" SUB_META;
    summary "summary" SUMMARY_META;
    sup "sup" SUP_META;
    svg "svg" SVG_META;
    table "table" TABLE_META;
    tbody "tbody" TBODY_META;
    td "td" TD_META;
    template "template" TEMPLATE_META;
    textarea "textarea" TEXTAREA_META;
    tfoot "tfoot" TFOOT_META;
    th "th" TH_META;
    thead "thead" THEAD_META;
    time "time" TIME_META;
    title "title" TITLE_META;
    tr "tr" TR_META;
    u "u" U_META;
    ul "ul" UL_META;
    var "var" VAR_META;
    video "video" VIDEO_META;
}

void_tags! {
    area "area" AREA_META;
    base "base" BASE_META;
    br "br" BR_META;
    col "col" COL_META;
    embed "embed" EMBED_META;
    hr "hr" HR_META;
    img "img" IMG_META;
    input "input" INPUT_META;
    link "link" LINK_META;
    meta "meta" META_META;
    param "param" PARAM_META;
    source "source" SOURCE_META;
    track "track" TRACK_META;
    wbr "wbr" WBR_META;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{attr::att, render, Context};

    #[test]
    fn t_normal_element() {
        let tree = div([att("id", 1)], "hello world");
        assert_eq!(render(&tree, &Context::new()).unwrap(),
                   "<div id=\"1\">hello world</div>");
    }

    #[test]
    fn t_void_element() {
        assert_eq!(render(&br(()), &Context::new()).unwrap(), "<br />");
        assert_eq!(render(&img([att("src", "x.png")]), &Context::new()).unwrap(),
                   "<img src=\"x.png\" />");
    }

    #[test]
    fn t_void_with_children_fails_at_construction() {
        let r = element(&BR_META, (), "child");
        assert!(matches!(r, Err(StructureError::VoidWithChildren { tag: "br" })));
    }

    #[test]
    fn t_empty_tag_name_fails_at_construction() {
        static BAD: ElementMeta = ElementMeta {
            tag_name: "",
            has_closing_tag: true,
        };
        assert!(matches!(element(&BAD, (), ()), Err(StructureError::EmptyTag)));
    }
}
