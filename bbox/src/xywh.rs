use super::{Rect, XYXY};
use crate::{common::*, Transform};

/// Bounding box in XYWH format, the top-left corner plus extent (COCO convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XYWH<T> {
    pub(crate) x: T,
    pub(crate) y: T,
    pub(crate) w: T,
    pub(crate) h: T,
}

impl<T> XYWH<T> {
    pub fn try_cast<V>(self) -> Option<XYWH<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(XYWH {
            x: V::from(self.x)?,
            y: V::from(self.y)?,
            w: V::from(self.w)?,
            h: V::from(self.h)?,
        })
    }

    pub fn cast<V>(self) -> XYWH<V>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        self.try_cast().unwrap()
    }
}

impl<T> XYWH<T>
where
    T: Copy + Num,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        XYWH {
            x: self.x * transform.sx + transform.tx,
            y: self.y * transform.sy + transform.ty,
            w: self.w * transform.sx,
            h: self.h * transform.sy,
        }
    }
}

impl<T> Rect for XYWH<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn x0(&self) -> Self::Type {
        self.x
    }

    fn y0(&self) -> Self::Type {
        self.y
    }

    fn x1(&self) -> Self::Type {
        self.x + self.w
    }

    fn y1(&self) -> Self::Type {
        self.y + self.h
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.x + self.w / two
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.y + self.h / two
    }

    fn w(&self) -> Self::Type {
        self.w
    }

    fn h(&self) -> Self::Type {
        self.h
    }

    fn try_from_xyxy(xyxy: [Self::Type; 4]) -> Result<Self> {
        let [x0, y0, x1, y1] = xyxy;
        ensure!(x1 >= x0 && y1 >= y0, "x1 >= x0 and y1 >= y0 must hold");
        Ok(Self {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

    fn try_from_xywh(xywh: [Self::Type; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        let zero = T::zero();
        ensure!(
            w >= zero && h >= zero,
            "box width and height must be non-negative"
        );
        Ok(Self { x, y, w, h })
    }
}

impl<T> From<XYXY<T>> for XYWH<T>
where
    T: Copy + Num,
{
    fn from(from: XYXY<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&XYXY<T>> for XYWH<T>
where
    T: Copy + Num,
{
    fn from(from: &XYXY<T>) -> Self {
        let XYXY { x0, y0, x1, y1 } = *from;
        Self {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        }
    }
}
